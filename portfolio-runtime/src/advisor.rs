//! Advisor client and suggestion parsing.
//!
//! The advisor service replies with free-form market commentary; when that
//! text spells out concrete allocation moves ("increase Layer 1 from 15% to
//! 20%"), they are extracted into a [`RebalanceAction`] the session can turn
//! into a draft. The extracted `from` values are informational only — the
//! session re-derives them from the live store at seed time.

use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AllocationError;
use crate::types::{RebalanceAction, SuggestedChange};

#[derive(Debug, Clone)]
pub struct AdvisorClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

/// One prior message in the advisor conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct AdviseRequest<'a> {
    message: &'a str,
    history: &'a [ChatTurn],
}

#[derive(Debug, Deserialize)]
struct AdviseResponse {
    content: String,
}

/// Advisor reply: the raw commentary plus any actionable suggestion parsed
/// out of it.
#[derive(Debug, Clone)]
pub struct AdvisorReply {
    pub content: String,
    pub action: Option<RebalanceAction>,
}

impl AdvisorClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn advise(
        &self,
        message: &str,
        history: &[ChatTurn],
    ) -> Result<AdvisorReply, AllocationError> {
        let url = format!("{}/advise", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&AdviseRequest { message, history })
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AllocationError::Advisor(format!(
                "advisor returned {}",
                response.status()
            )));
        }

        let body: AdviseResponse = response
            .json()
            .await
            .map_err(|e| AllocationError::Advisor(e.to_string()))?;

        let action = parse_rebalance_action(&body.content);
        Ok(AdvisorReply {
            content: body.content,
            action,
        })
    }
}

/// Placeholder used by the relative patterns ("increase X by 5%") where the
/// text carries no current value; replaced with the live percentage when the
/// suggestion is seeded into a draft.
const PLACEHOLDER_FROM: u32 = 15;

/// Map the free-form category wording onto a known category id.
fn category_alias(raw: &str) -> Option<(&'static str, &'static str)> {
    let key = raw.trim().to_lowercase();
    let entry = match key.as_str() {
        "ai" | "artificial intelligence" => ("ai", "AI & DeFi"),
        "meme" | "meme coin" | "meme coins" | "nft" => ("meme", "Meme & NFT"),
        "rwa" | "real world assets" => ("rwa", "Real World Assets"),
        "big cap" | "bigcap" | "large cap" => ("bigcap", "Big Cap"),
        "defi" | "decentralized finance" => ("defi", "DeFi"),
        "layer 1" | "l1" => ("l1", "Layer 1"),
        "stablecoin" | "stablecoins" | "stable" => ("stablecoin", "Stablecoins"),
        _ => return None,
    };
    Some(entry)
}

/// Extract concrete allocation moves from advisor text.
///
/// Absolute forms ("increase X from N% to M%") are preferred; the relative
/// and assignment forms ("increase X by N%", "allocate N% to X") are only
/// consulted when no absolute form matched.
pub fn parse_rebalance_action(text: &str) -> Option<RebalanceAction> {
    let lower = text.to_lowercase();
    if !(lower.contains("allocation") || lower.contains("portfolio") || lower.contains("rebalance"))
    {
        return None;
    }

    let mut changes: Vec<SuggestedChange> = Vec::new();

    let push = |changes: &mut Vec<SuggestedChange>, raw: &str, from: u32, to: u32| {
        if let Some((id, name)) = category_alias(raw) {
            changes.push(SuggestedChange {
                category: id.to_string(),
                name: name.to_string(),
                from,
                to,
            });
        }
    };

    let increase_from_to =
        Regex::new(r"(?i)increase\s+([\w ]+?)\s+from\s+(\d+)%\s+to\s+(\d+)%").expect("valid regex");
    for caps in increase_from_to.captures_iter(text) {
        if let (Ok(from), Ok(to)) = (caps[2].parse(), caps[3].parse()) {
            push(&mut changes, &caps[1], from, to);
        }
    }

    let decrease_from_to =
        Regex::new(r"(?i)decrease\s+([\w ]+?)\s+from\s+(\d+)%\s+to\s+(\d+)%").expect("valid regex");
    for caps in decrease_from_to.captures_iter(text) {
        if let (Ok(from), Ok(to)) = (caps[2].parse(), caps[3].parse()) {
            push(&mut changes, &caps[1], from, to);
        }
    }

    if changes.is_empty() {
        let increase_by = Regex::new(r"(?i)increase\s+([\w ]+?)\s+by\s+(\d+)%").expect("valid regex");
        for caps in increase_by.captures_iter(text) {
            if let Ok(amount) = caps[2].parse::<u32>() {
                push(
                    &mut changes,
                    &caps[1],
                    PLACEHOLDER_FROM,
                    PLACEHOLDER_FROM + amount,
                );
            }
        }

        let decrease_by = Regex::new(r"(?i)decrease\s+([\w ]+?)\s+by\s+(\d+)%").expect("valid regex");
        for caps in decrease_by.captures_iter(text) {
            if let Ok(amount) = caps[2].parse::<u32>() {
                push(
                    &mut changes,
                    &caps[1],
                    PLACEHOLDER_FROM,
                    PLACEHOLDER_FROM.saturating_sub(amount),
                );
            }
        }

        let allocate = Regex::new(r"(?i)allocate\s+(\d+)%\s+to\s+([\w ]+)").expect("valid regex");
        for caps in allocate.captures_iter(text) {
            if let Ok(to) = caps[1].parse::<u32>() {
                push(&mut changes, &caps[2], PLACEHOLDER_FROM, to);
            }
        }
    }

    if changes.is_empty() {
        return None;
    }

    Some(RebalanceAction {
        description: "Apply AI-suggested portfolio changes".to_string(),
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_absolute_forms() {
        let text = "Given current market conditions I would rebalance: \
                    increase Layer 1 from 15% to 20% and decrease meme coins from 10% to 5%.";
        let action = parse_rebalance_action(text).unwrap();

        assert_eq!(action.changes.len(), 2);
        assert_eq!(action.changes[0].category, "l1");
        assert_eq!(action.changes[0].from, 15);
        assert_eq!(action.changes[0].to, 20);
        assert_eq!(action.changes[1].category, "meme");
        assert_eq!(action.changes[1].to, 5);
    }

    #[test]
    fn test_parse_relative_forms() {
        let text = "Portfolio suggestion: increase defi by 5% and decrease stablecoins by 3%.";
        let action = parse_rebalance_action(text).unwrap();

        assert_eq!(action.changes.len(), 2);
        assert_eq!(action.changes[0].category, "defi");
        assert_eq!(action.changes[0].to, PLACEHOLDER_FROM + 5);
        assert_eq!(action.changes[1].category, "stablecoin");
        assert_eq!(action.changes[1].to, PLACEHOLDER_FROM - 3);
    }

    #[test]
    fn test_parse_allocate_form() {
        let text = "For this portfolio, allocate 30% to big cap";
        let action = parse_rebalance_action(text).unwrap();

        assert_eq!(action.changes[0].category, "bigcap");
        assert_eq!(action.changes[0].to, 30);
    }

    #[test]
    fn test_absolute_forms_win_over_relative() {
        let text = "Rebalance: increase l1 from 15% to 20%. You could also increase rwa by 2%.";
        let action = parse_rebalance_action(text).unwrap();

        assert_eq!(action.changes.len(), 1);
        assert_eq!(action.changes[0].category, "l1");
    }

    #[test]
    fn test_unrelated_text_yields_no_action() {
        assert!(parse_rebalance_action("The weather is nice today.").is_none());
        assert!(
            parse_rebalance_action("Your portfolio looks well balanced, no changes needed.")
                .is_none()
        );
    }

    #[test]
    fn test_unknown_category_skipped() {
        let text = "Rebalance: increase gamefi from 10% to 20%.";
        assert!(parse_rebalance_action(text).is_none());
    }

    #[tokio::test]
    async fn test_advise_parses_action() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/advise"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": "Based on whale flows I suggest a portfolio rebalance: \
                            increase Layer 1 from 15% to 20% and decrease meme from 10% to 5%."
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = AdvisorClient::new(mock_server.uri());
        let reply = client.advise("should I rebalance?", &[]).await.unwrap();

        let action = reply.action.unwrap();
        assert_eq!(action.changes.len(), 2);
        assert!(reply.content.contains("whale flows"));
    }

    #[tokio::test]
    async fn test_advise_without_suggestion() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/advise"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": "MON is trading sideways; nothing actionable right now."
            })))
            .mount(&mock_server)
            .await;

        let client = AdvisorClient::new(mock_server.uri());
        let reply = client.advise("any advice?", &[]).await.unwrap();
        assert!(reply.action.is_none());
    }

    #[tokio::test]
    async fn test_advise_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/advise"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = AdvisorClient::new(mock_server.uri());
        let err = client.advise("any advice?", &[]).await.unwrap_err();
        assert!(matches!(err, AllocationError::Advisor(_)));
    }
}
