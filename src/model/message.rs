//! Task-protocol v2 message envelope.
//!
//! The external worker consumes JSON envelopes from a Redis list named after the queue. The
//! envelope's `body` is the base64-encoded JSON triple `[args, kwargs, embed]`; routing and
//! delivery metadata live in `properties`, task metadata in `headers`. Only the fields the
//! worker actually reads are populated; everything else is sent as `null` the way the
//! Python client does.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::model::job::ChurnJob;

const CONTENT_TYPE: &str = "application/json";
const CONTENT_ENCODING: &str = "utf-8";
const BODY_ENCODING: &str = "base64";

/// Persistent delivery, matching the client default.
const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// A single task message as stored in the broker list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskMessage {
    /// Base64-encoded JSON `[args, kwargs, embed]`.
    pub body: String,
    #[serde(rename = "content-encoding")]
    pub content_encoding: String,
    #[serde(rename = "content-type")]
    pub content_type: String,
    pub headers: TaskHeaders,
    pub properties: TaskProperties,
}

/// Task metadata read by the worker before it decodes the body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskHeaders {
    pub lang: String,
    pub task: String,
    pub id: String,
    pub shadow: Option<String>,
    pub eta: Option<String>,
    pub expires: Option<String>,
    pub group: Option<String>,
    pub group_index: Option<u32>,
    pub retries: u32,
    pub timelimit: (Option<f64>, Option<f64>),
    pub root_id: String,
    pub parent_id: Option<String>,
    pub argsrepr: String,
    pub kwargsrepr: String,
    pub origin: String,
    pub ignore_result: bool,
}

/// Broker-level delivery properties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskProperties {
    pub correlation_id: String,
    pub reply_to: String,
    pub delivery_mode: u8,
    pub delivery_info: DeliveryInfo,
    pub priority: u8,
    pub body_encoding: String,
    pub delivery_tag: String,
}

/// Exchange and routing key the message was published with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryInfo {
    pub exchange: String,
    pub routing_key: String,
}

impl TaskMessage {
    /// Builds the envelope for one invocation of `task_name` with the job's range as its only
    /// positional argument.
    ///
    /// Every call produces fresh task, correlation, and delivery ids.
    ///
    /// # Arguments
    /// - `task_name` - Registered task name on the worker (e.g. `tasks.churn_task`)
    /// - `routing_key` - Queue the worker consumes from
    /// - `origin` - Sender identity recorded in the headers
    /// - `job` - Job whose range is passed as the task argument
    pub fn for_job(
        task_name: &str,
        routing_key: &str,
        origin: &str,
        job: &ChurnJob,
    ) -> Result<Self, serde_json::Error> {
        let task_id = Uuid::new_v4().to_string();

        let body = json!([
            [job.n],
            {},
            {
                "callbacks": null,
                "errbacks": null,
                "chain": null,
                "chord": null
            }
        ]);
        let body = STANDARD.encode(serde_json::to_vec(&body)?);

        Ok(Self {
            body,
            content_encoding: CONTENT_ENCODING.to_string(),
            content_type: CONTENT_TYPE.to_string(),
            headers: TaskHeaders {
                lang: "py".to_string(),
                task: task_name.to_string(),
                id: task_id.clone(),
                shadow: None,
                eta: None,
                expires: None,
                group: None,
                group_index: None,
                retries: 0,
                timelimit: (None, None),
                root_id: task_id.clone(),
                parent_id: None,
                argsrepr: format!("({},)", job.n),
                kwargsrepr: "{}".to_string(),
                origin: origin.to_string(),
                ignore_result: false,
            },
            properties: TaskProperties {
                correlation_id: task_id,
                reply_to: Uuid::new_v4().to_string(),
                delivery_mode: DELIVERY_MODE_PERSISTENT,
                delivery_info: DeliveryInfo {
                    exchange: String::new(),
                    routing_key: routing_key.to_string(),
                },
                priority: 0,
                body_encoding: BODY_ENCODING.to_string(),
                delivery_tag: Uuid::new_v4().to_string(),
            },
        })
    }

    /// Serializes the envelope to the JSON string pushed onto the broker list.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes the body back into its `[args, kwargs, embed]` JSON value.
    ///
    /// Returns `None` when the body is not valid base64 JSON.
    pub fn decoded_body(&self) -> Option<serde_json::Value> {
        let bytes = STANDARD.decode(&self.body).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}
