use crate::domain::contract::LlmPortfolioRecord;
use crate::domain::portfolio::PortfolioRecord;
use anyhow::Context;

const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq)]
struct FencedBlock<'a> {
    tag: &'a str,
    body: &'a str,
    closed: bool,
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.')
}

/// Splits `text` into markdown fenced blocks, in order of appearance. An
/// opening fence without a closing one runs to the end of the text.
fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let after_fence = &rest[open + FENCE.len()..];
        let after_ws = after_fence.trim_start_matches([' ', '\t']);
        let tag_len = after_ws
            .char_indices()
            .find(|(_, c)| !is_tag_char(*c))
            .map(|(i, _)| i)
            .unwrap_or(after_ws.len());
        let tag = &after_ws[..tag_len];
        let body_start = &after_ws[tag_len..];

        match body_start.find(FENCE) {
            Some(close) => {
                blocks.push(FencedBlock {
                    tag,
                    body: &body_start[..close],
                    closed: true,
                });
                rest = &body_start[close + FENCE.len()..];
            }
            None => {
                blocks.push(FencedBlock {
                    tag,
                    body: body_start,
                    closed: false,
                });
                break;
            }
        }
    }

    blocks
}

/// Picks the JSON candidate out of free-form model text.
///
/// The first `json`-tagged block wins, then the first fenced block of any kind.
/// Without fences the text is used as-is when it already looks like JSON,
/// otherwise the outermost `{ ... }` span is tried.
pub fn extract_json(text: &str) -> Option<String> {
    let blocks = fenced_blocks(text);
    let chosen = blocks
        .iter()
        .find(|b| b.tag.eq_ignore_ascii_case("json"))
        .or_else(|| blocks.first());

    if let Some(block) = chosen {
        if !block.closed {
            tracing::debug!(tag = block.tag, "fenced block has no closing fence; using remainder");
        }
        return Some(block.body.trim().to_string());
    }

    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed.to_string());
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].to_string())
}

/// Extracts and parses the JSON payload without interpreting its shape.
pub fn extract_value(text: &str) -> anyhow::Result<serde_json::Value> {
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    serde_json::from_str::<serde_json::Value>(&json_str)
        .with_context(|| format!("LLM output is not valid JSON: {json_str}"))
}

pub fn parse_portfolio(text: &str) -> anyhow::Result<PortfolioRecord> {
    let value = extract_value(text)?;
    let parsed = serde_json::from_value::<LlmPortfolioRecord>(value)
        .context("LLM output does not match the portfolio schema")?;
    parsed.validate_and_into_record()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BODY: &str = r#"{"portfolio": [], "expected_annual_return": 7.5}"#;

    fn portfolio_json() -> String {
        json!({
            "portfolio": [{
                "asset_name": "iShares Core MSCI World",
                "ticker": "IWDA",
                "allocation_percentage": 100.0,
                "investment_amount": 50000,
                "asset_class": "Equity",
                "currency": "USD",
                "description": "Developed markets equity.",
                "buying_strategy": "Buy monthly over 6 months"
            }],
            "portfolio_commentary": "Simple and diversified.",
            "expected_annual_return": 6.0,
            "risk_level": "Medium",
            "max_expected_yearly_loss": 12.0
        })
        .to_string()
    }

    #[test]
    fn json_tagged_plain_and_bare_agree() {
        let expected: serde_json::Value = serde_json::from_str(BODY).unwrap();

        let tagged = format!("```json\n{BODY}\n```");
        let plain = format!("```\n{BODY}\n```");

        assert_eq!(extract_value(&tagged).unwrap(), expected);
        assert_eq!(extract_value(&plain).unwrap(), expected);
        assert_eq!(extract_value(BODY).unwrap(), expected);
    }

    #[test]
    fn extract_json_handles_prose_around_fence() {
        let text = format!("Here is your portfolio:\n```JSON\n{BODY}\n```\nGood luck!");
        assert_eq!(extract_json(&text), Some(BODY.to_string()));
    }

    #[test]
    fn json_tagged_block_wins_over_earlier_block() {
        let text = format!("```text\nnot json\n```\n```json\n{BODY}\n```");
        assert_eq!(extract_json(&text), Some(BODY.to_string()));
    }

    #[test]
    fn first_untagged_block_wins_without_json_tag() {
        let text = format!("```\n{BODY}\n```\n```\n{{\"other\": true}}\n```");
        assert_eq!(extract_json(&text), Some(BODY.to_string()));
    }

    #[test]
    fn unclosed_fence_uses_remainder() {
        let text = format!("```json\n{BODY}\n");
        assert_eq!(extract_json(&text), Some(BODY.to_string()));
    }

    #[test]
    fn inline_fence_is_supported() {
        let text = format!("```json{BODY}```");
        assert_eq!(extract_json(&text), Some(BODY.to_string()));
    }

    #[test]
    fn extract_json_falls_back_to_braces() {
        let s = "prefix {\"a\":1} suffix";
        assert_eq!(extract_json(s), Some("{\"a\":1}".to_string()));
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn trailing_comma_fails() {
        let text = "```json\n{\"portfolio\": [],}\n```";
        assert!(extract_value(text).is_err());
        assert!(parse_portfolio(text).is_err());
    }

    #[test]
    fn parse_portfolio_accepts_fenced_reply() {
        let text = format!("```json\n{}\n```", portfolio_json());
        let record = parse_portfolio(&text).unwrap();
        assert_eq!(record.portfolio.len(), 1);
        assert_eq!(record.portfolio[0].ticker, "IWDA");
        assert_eq!(record.risk_level.as_deref(), Some("Medium"));
        assert_eq!(record.expected_annual_return, Some(6.0));
    }

    #[test]
    fn parse_portfolio_rejects_schema_mismatch() {
        let err = parse_portfolio(r#"{"assets": []}"#).unwrap_err();
        assert!(err.to_string().contains("portfolio schema"));
    }
}
