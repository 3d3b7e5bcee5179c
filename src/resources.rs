//! Add-on provisioning endpoints called by Heroku.
//!
//! Each handler answers with a fixed payload; no resource state is kept.
//! All three sit behind [`BasicAuth`](crate::middleware::basic_auth::BasicAuth)
//! in [`app`](crate::app).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::request::Request;
use crate::response::{IntoResponse, Json, Response};
use crate::status::Status;

const CONFIG_KEY: &str = "KENSA_CREATE_GO_URL";
const CONFIG_URL: &str = "https://kensa-create-go.com/resources/1";

/// Missing fields decode as empty strings; only malformed JSON is refused.
#[derive(Debug, Deserialize)]
pub struct ProvisionRequest {
    #[serde(default)]
    pub heroku_id: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub callback_url: String,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ProvisionResponse {
    pub id: String,
    pub config: HashMap<String, String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PlanChangeRequest {
    #[serde(default)]
    pub heroku_id: String,
    #[serde(default)]
    pub plan: String,
}

#[derive(Debug, Serialize)]
pub struct PlanChangeResponse {
    pub config: HashMap<String, String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeprovisionResponse {
    pub message: String,
}

fn config() -> HashMap<String, String> {
    HashMap::from([(CONFIG_KEY.to_owned(), CONFIG_URL.to_owned())])
}

fn invalid_body() -> Response {
    Response::message(Status::BadRequest, "Invalid body")
}

// POST /heroku/resources
pub async fn provision(req: Request) -> Response {
    let Ok(input) = req.json::<ProvisionRequest>() else {
        return invalid_body();
    };
    info!(heroku_id = %input.heroku_id, plan = %input.plan, "provision");

    Json(ProvisionResponse {
        id: "1".to_owned(),
        config: config(),
        message: "All set up!".to_owned(),
    })
    .into_response()
}

// PUT /heroku/resources/{id}
pub async fn change_plan(req: Request) -> Response {
    let Ok(input) = req.json::<PlanChangeRequest>() else {
        return invalid_body();
    };
    info!(id = req.param("id"), heroku_id = %input.heroku_id, plan = %input.plan, "plan change");

    Json(PlanChangeResponse { config: config(), message: "All updated!".to_owned() }).into_response()
}

// DELETE /heroku/resources/{id}
pub async fn deprovision(req: Request) -> Response {
    info!(id = req.param("id"), "deprovision");
    Json(DeprovisionResponse { message: "All torn down!".to_owned() }).into_response()
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn json_body(res: &Response) -> Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[tokio::test]
    async fn provision_returns_config() {
        let req = Request::new(
            "POST",
            "/heroku/resources",
            Vec::new(),
            r#"{"heroku_id":"app123@heroku.com","plan":"test","callback_url":"https://x","options":{}}"#,
        );
        let res = provision(req).await;
        assert_eq!(res.status_code(), 200);
        let body = json_body(&res);
        assert_eq!(body["id"], "1");
        assert_eq!(body["config"][CONFIG_KEY], CONFIG_URL);
        assert_eq!(body["message"], "All set up!");
    }

    #[tokio::test]
    async fn provision_rejects_bad_json() {
        let res = provision(Request::new("POST", "/heroku/resources", Vec::new(), "nope")).await;
        assert_eq!(res.status_code(), 400);
        assert_eq!(json_body(&res)["message"], "Invalid body");
    }

    #[tokio::test]
    async fn missing_fields_are_accepted() {
        let res = provision(Request::new("POST", "/heroku/resources", Vec::new(), "{}")).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(json_body(&res)["message"], "All set up!");

        let req = Request::new("PUT", "/heroku/resources/1", Vec::new(), r#"{"plan":"big"}"#);
        let res = change_plan(req).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(json_body(&res)["message"], "All updated!");
    }

    #[tokio::test]
    async fn change_plan_rejects_non_object() {
        let req = Request::new("PUT", "/heroku/resources/1", Vec::new(), "[1,2]");
        assert_eq!(change_plan(req).await.status_code(), 400);
    }

    #[tokio::test]
    async fn deprovision_ignores_body() {
        let res = deprovision(Request::new("DELETE", "/heroku/resources/1", Vec::new(), "")).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(json_body(&res)["message"], "All torn down!");
    }
}
