//! Per-model token pricing (USD per token).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Look up (input, output) cost per token for a model.
///
/// Unknown models are priced at zero rather than guessed.
pub fn model_cost(model: &str) -> (Decimal, Decimal) {
    let model = model.to_lowercase();
    if model.starts_with("gpt-4o-mini") {
        (dec!(0.00000015), dec!(0.0000006))
    } else if model.starts_with("gpt-4o") {
        (dec!(0.0000025), dec!(0.00001))
    } else if model.starts_with("gpt-4.1-mini") {
        (dec!(0.0000004), dec!(0.0000016))
    } else if model.starts_with("gpt-4.1") {
        (dec!(0.000002), dec!(0.000008))
    } else if model.contains("haiku") {
        (dec!(0.0000008), dec!(0.000004))
    } else if model.contains("sonnet") {
        (dec!(0.000003), dec!(0.000015))
    } else if model.contains("opus") {
        (dec!(0.000015), dec!(0.000075))
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    }
}

/// Cost of a single call given token counts.
pub fn call_cost(costs: (Decimal, Decimal), input_tokens: u32, output_tokens: u32) -> Decimal {
    let (input, output) = costs;
    input * Decimal::from(input_tokens) + output * Decimal::from(output_tokens)
}
