use crate::framework::{Action, BoxError, Connection, HttpMethod, Params, WebRoute};
use crate::initializers::{ProcessInfo, PROCESS_SERVICE};
use async_trait::async_trait;
use serde_json::{json, Value};

/// `GET /status`: process name, pid, version and uptime in milliseconds.
pub struct Status;

#[async_trait]
impl Action for Status {
    fn name(&self) -> &str {
        "status"
    }

    fn web(&self) -> Option<WebRoute> {
        Some(WebRoute::new(HttpMethod::Get, "/status"))
    }

    async fn run(&self, _params: Params, connection: &mut Connection) -> Result<Value, BoxError> {
        let process = connection.services().require::<ProcessInfo>(PROCESS_SERVICE)?;
        Ok(json!({
            "name": process.name,
            "pid": process.pid,
            "version": process.version,
            "uptime": process.uptime().as_millis() as u64,
        }))
    }
}
