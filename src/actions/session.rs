use crate::framework::{Action, BoxError, Connection, HttpMethod, Input, Inputs, Params, WebRoute};
use crate::util::{formatters, validators};
use async_trait::async_trait;
use serde_json::{json, Value};

/// `PUT /session`: stores the caller's email, optional display name and
/// `remember` flag in their session.
///
/// A `password`, when sent, must pass [`validators::password`] and is never
/// written to the session.
pub struct SessionCreate;

#[async_trait]
impl Action for SessionCreate {
    fn name(&self) -> &str {
        "sessionCreate"
    }

    fn inputs(&self) -> Inputs {
        Inputs::new()
            .input(
                "email",
                Input::required()
                    .formatter(formatters::lowercase)
                    .validator(validators::email),
            )
            .input("name", Input::optional().formatter(formatters::ensure_string))
            .input(
                "password",
                Input::optional()
                    .formatter(formatters::ensure_string)
                    .validator(validators::password),
            )
            .input(
                "remember",
                Input::optional()
                    .default_value(false)
                    .formatter(formatters::ensure_bool),
            )
    }

    fn web(&self) -> Option<WebRoute> {
        Some(WebRoute::new(HttpMethod::Put, "/session"))
    }

    async fn run(
        &self,
        mut params: Params,
        connection: &mut Connection,
    ) -> Result<Value, BoxError> {
        params.remove("password");
        let session = connection.update_session(params).await?;
        Ok(json!({ "session": session }))
    }
}

/// `GET /session`: the caller's session, or `null`.
pub struct SessionView;

#[async_trait]
impl Action for SessionView {
    fn name(&self) -> &str {
        "sessionView"
    }

    fn web(&self) -> Option<WebRoute> {
        Some(WebRoute::new(HttpMethod::Get, "/session"))
    }

    async fn run(&self, _params: Params, connection: &mut Connection) -> Result<Value, BoxError> {
        let session = connection.session().await?;
        Ok(json!({ "session": session }))
    }
}

/// `DELETE /session`
pub struct SessionDestroy;

#[async_trait]
impl Action for SessionDestroy {
    fn name(&self) -> &str {
        "sessionDestroy"
    }

    fn web(&self) -> Option<WebRoute> {
        Some(WebRoute::new(HttpMethod::Delete, "/session"))
    }

    async fn run(&self, _params: Params, connection: &mut Connection) -> Result<Value, BoxError> {
        connection.destroy_session().await?;
        Ok(json!({ "success": true }))
    }
}
