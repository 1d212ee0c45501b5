use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::use_cases::ScoringSink;

#[derive(Debug, Serialize)]
struct DamageRequest {
    team_id: u64,
    amount: f64,
}

#[derive(Debug, Serialize)]
struct PenaltyRequest {
    team_id: u64,
    points: i64,
    charge_id: u64,
}

// Thin reqwest client for the external scoring service. Deliveries are
// fire-and-forget from the session's point of view; the caller logs and
// drops failures.
#[derive(Clone)]
pub struct ScoringClient {
    http: reqwest::Client,
    base_url: String,
}

impl ScoringClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<(), String> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("scoring service unreachable: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("scoring service returned {}", response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl ScoringSink for ScoringClient {
    async fn apply_damage(&self, team_id: u64, amount: f64) -> Result<(), String> {
        self.post("/scores/damage", &DamageRequest { team_id, amount })
            .await
    }

    async fn apply_penalty(
        &self,
        team_id: u64,
        points: i64,
        charge_id: u64,
    ) -> Result<(), String> {
        self.post(
            "/scores/penalty",
            &PenaltyRequest {
                team_id,
                points,
                charge_id,
            },
        )
        .await
    }
}
