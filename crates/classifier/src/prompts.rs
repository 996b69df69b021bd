/// Instructions pinning the classifier to the three canonical answer shapes
/// the signal grammar understands. Anything else downstream is dropped as
/// noise, so the prompt is strict about the output format.
pub const SYSTEM_PROMPT: &str = "\
You classify posts from a crypto futures signal channel. Answer with exactly \
one line and nothing else, in one of three forms:\n\
1. An entry signal: `<ASSET> <Long|Short> Leverage:<N>x TP:<price> SL:<price>` \
(example: `BTC Long Leverage:5x TP:70000 SL:60000`). The asset is the bare \
ticker without a quote currency.\n\
2. An exit signal: `<ASSET> close all` to close the whole position, or \
`<ASSET> close <P>%` to close P percent of it (example: `ETH close 50%`).\n\
3. The single word `NOISE` for anything that is not a concrete trading \
instruction: market commentary, promotions, recaps, or ambiguous calls.\n\
Never invent numbers that are not in the post. When unsure, answer NOISE.";

/// Wraps a raw channel post for the user turn of the classification request.
pub fn build_prompt(message: &str) -> String {
    format!("Classify the following channel post:\n\n{message}")
}
