//! The prelude is enough to build, serve and test an application.

use stitch::prelude::*;
use stitch_test::TestClient;

fn app() -> Chain {
    let api = Chain::new()
        .get(terminal(|req, res| async move {
            res.end(format!("item {}", req.path()))?;
            Ok(())
        }))
        .delete(|_req, _res, _next| async move { Err(ChainError::msg("read only")) });

    Chain::new()
        .all(|req, res, next| async move {
            res.set_header("x-request-id", req.id().to_string())?;
            next.run().await;
            Ok(())
        })
        .mount(api)
        .error(|err, _req, res, _next| async move {
            res.send_text(StatusCode::FORBIDDEN, err.message())?;
            Ok(())
        })
}

#[tokio::test]
async fn prelude_builds_a_working_app() {
    let client = TestClient::new(app());

    let response = client.get("/items/1").send().await;
    response
        .assert_status(StatusCode::OK)
        .assert_body_eq("item /items/1");
    assert!(response.header_str("x-request-id").is_some());

    client
        .delete("/items/1")
        .send()
        .await
        .assert_status(StatusCode::FORBIDDEN)
        .assert_body_eq("read only");

    client
        .request(Method::POST, "/items")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[test]
fn config_converts_into_server_config() {
    let config = ConfigLoader::new()
        .with_string("[server]\nhttp_addr = \"127.0.0.1:4000\"", "toml")
        .unwrap()
        .load()
        .unwrap();

    let server = Server::new(app(), config.server_config());
    assert_eq!(server.config().http_addr(), "127.0.0.1:4000");
}
