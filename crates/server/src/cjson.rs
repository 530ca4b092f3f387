use salvo::http::header::{CONTENT_TYPE, HeaderValue};
use salvo::http::{Response, StatusError};
use salvo::{Scribe, async_trait};
use serde::Serialize;

use crate::core::serde::{CanonicalJsonError, to_canonical_string};

/// Renders its value as canonical JSON: sorted keys, no insignificant
/// whitespace.
pub struct Cjson<T>(pub T);

#[async_trait]
impl<T> Scribe for Cjson<T>
where
    T: Serialize + Send,
{
    fn render(self, res: &mut Response) {
        match try_to_string(&self.0) {
            Ok(body) => {
                res.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                res.write_body(body).ok();
            }
            Err(e) => {
                tracing::error!(error = ?e, "canonical json write error");
                res.render(StatusError::internal_server_error());
            }
        }
    }
}

fn try_to_string<T>(data: &T) -> Result<String, CanonicalJsonError>
where
    T: Serialize + Send,
{
    to_canonical_string(&serde_json::to_value(data)?)
}

#[cfg(test)]
mod tests {
    use salvo::prelude::*;
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;

    use super::Cjson;

    #[handler]
    async fn canonical(res: &mut Response) {
        res.render(Cjson(json!({ "b": 1, "a": { "d": [1, 2], "c": "x" } })));
    }

    #[tokio::test]
    async fn sorts_keys_without_whitespace() {
        let service = Service::new(Router::new().get(canonical));
        let mut res = TestClient::get("http://127.0.0.1/").send(&service).await;
        assert_eq!(
            res.headers().get("content-type").unwrap().to_str().unwrap(),
            "application/json"
        );
        assert_eq!(res.take_string().await.unwrap(), r#"{"a":{"c":"x","d":[1,2]},"b":1}"#);
    }
}
