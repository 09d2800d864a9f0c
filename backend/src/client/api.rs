use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::sign_user_token;
use crate::handlers::pairing::{AcceptResponse, RejectResponse, ValidateResponse};
use crate::models::{CoupleEvent, CoupleWithPartner, EventKind, IncomingRequest, PairRequest, Position};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error body; the message is shown to the
    /// user verbatim.
    #[error("{message}")]
    Api { status: StatusCode, message: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Thin JSON client for the pairing service. One instance per signed-in
/// user; the bearer token rides on every call.
#[derive(Debug, Clone)]
pub struct PairingApi {
    http: Client,
    base_url: String,
    token: String,
}

impl PairingApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Convenience constructor for callers that hold the shared secret
    /// (tests, tooling).
    pub fn with_signed_token(base_url: impl Into<String>, secret: &str, user_id: &str) -> Self {
        Self::new(base_url, sign_user_token(secret, user_id))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        #[derive(Deserialize)]
        struct ErrorBody {
            error: String,
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| status.to_string());

        Err(ClientError::Api { status, message })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.http.get(self.url(path))).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ClientError> {
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    pub async fn bind(&self, partner_id: &str) -> Result<PairRequest, ClientError> {
        self.post("/bind", &json!({ "partnerId": partner_id })).await
    }

    pub async fn pending_requests(&self) -> Result<Vec<IncomingRequest>, ClientError> {
        self.get("/requests").await
    }

    pub async fn accept(&self, request_id: Uuid) -> Result<AcceptResponse, ClientError> {
        self.post("/accept", &json!({ "requestId": request_id })).await
    }

    pub async fn reject(&self, request_id: Uuid) -> Result<RejectResponse, ClientError> {
        self.post("/reject", &json!({ "requestId": request_id })).await
    }

    pub async fn relation(&self) -> Result<Option<CoupleWithPartner>, ClientError> {
        self.get("/relation").await
    }

    pub async fn validate(&self, couple_id: Uuid) -> Result<ValidateResponse, ClientError> {
        self.post("/validate", &json!({ "coupleId": couple_id })).await
    }

    pub async fn unbind(&self) -> Result<(), ClientError> {
        #[derive(Deserialize)]
        struct Ack {
            #[allow(dead_code)]
            success: bool,
        }
        let _: Ack = self.post("/unbind", &json!({})).await?;
        Ok(())
    }

    pub async fn events(&self) -> Result<Vec<CoupleEvent>, ClientError> {
        self.get("/events").await
    }

    pub async fn create_event(
        &self,
        content: &str,
        kind: EventKind,
        position: Option<Position>,
    ) -> Result<CoupleEvent, ClientError> {
        self.post(
            "/events",
            &json!({ "content": content, "type": kind, "position": position }),
        )
        .await
    }

    pub async fn update_event(
        &self,
        event_id: Uuid,
        patch: &Value,
    ) -> Result<CoupleEvent, ClientError> {
        self.send(
            self.http
                .put(self.url(&format!("/events/{event_id}")))
                .json(patch),
        )
        .await
    }

    pub async fn delete_event(&self, event_id: Uuid) -> Result<(), ClientError> {
        #[derive(Deserialize)]
        struct Ack {
            #[allow(dead_code)]
            success: bool,
        }
        let _: Ack = self
            .send(self.http.delete(self.url(&format!("/events/{event_id}"))))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_the_server_message() {
        let err = ClientError::Api {
            status: StatusCode::BAD_REQUEST,
            message: "不能绑定自己".to_string(),
        };
        assert_eq!(err.to_string(), "不能绑定自己");
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let api = PairingApi::new("http://localhost:3000/", "token");
        assert_eq!(api.url("/bind"), "http://localhost:3000/bind");
    }
}
