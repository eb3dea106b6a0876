//! Method dispatch: every entry point, `all`, extension methods.

use http::{Method, StatusCode};
use proptest::prelude::*;
use stitch_chain::{terminal, Chain, HandlerResult, Next};
use stitch_core::{Request, Response, STANDARD_METHODS};

async fn send(chain: &Chain, method: Method) -> Response {
    let res = Response::new();
    chain.handle(Request::new(method, "/"), res.clone()).await;
    res
}

async fn echo_method(req: Request, res: Response, _next: Next) -> HandlerResult {
    res.end(req.method().as_str())?;
    Ok(())
}

/// One layer per standard method, each answering with its own method name.
fn per_method_chain() -> Chain {
    Chain::new()
        .get(echo_method)
        .head(echo_method)
        .post(echo_method)
        .put(echo_method)
        .delete(echo_method)
        .options(echo_method)
        .trace(echo_method)
        .patch(echo_method)
}

fn extension_method() -> impl Strategy<Value = Method> {
    "[A-Z]{3,10}"
        .prop_filter("not a standard method", |name| {
            STANDARD_METHODS.iter().all(|method| method.as_str() != name.as_str())
        })
        .prop_map(|name| Method::from_bytes(name.as_bytes()).unwrap())
}

proptest! {
    #[test]
    fn each_method_reaches_only_its_own_layer(method in proptest::sample::select(STANDARD_METHODS.to_vec())) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let res = rt.block_on(send(&per_method_chain(), method.clone()));
        prop_assert_eq!(res.status(), StatusCode::OK);
        prop_assert_eq!(res.body(), method.as_str());
    }

    #[test]
    fn unregistered_methods_fall_through(method in extension_method()) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let res = rt.block_on(send(&per_method_chain(), method));
        prop_assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn all_reaches_every_method(method in prop_oneof![
        proptest::sample::select(STANDARD_METHODS.to_vec()),
        extension_method(),
    ]) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let chain = Chain::new().all(echo_method);
        let res = rt.block_on(send(&chain, method.clone()));
        prop_assert_eq!(res.body(), method.as_str());
    }
}

#[tokio::test]
async fn get_layer_ignores_other_methods() {
    let chain = Chain::new().get(terminal(|_req, res| async move {
        res.end("x")?;
        Ok(())
    }));

    let res = send(&chain, Method::GET).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body(), "x");

    assert_eq!(send(&chain, Method::POST).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(send(&chain, Method::HEAD).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn extension_methods_register_through_on() {
    let purge = Method::from_bytes(b"PURGE").unwrap();
    let chain = Chain::new().on(purge.clone(), echo_method);

    assert_eq!(send(&chain, purge).await.body(), "PURGE");
    assert_eq!(send(&chain, Method::GET).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn all_works_as_middleware() {
    let chain = Chain::new()
        .all(|_req, res, next| async move {
            res.set_header("x-middleware", "applied")?;
            next.run().await;
            Ok(())
        })
        .put(echo_method);

    let res = send(&chain, Method::PUT).await;
    assert_eq!(res.header("x-middleware").unwrap(), "applied");
    assert_eq!(res.body(), "PUT");

    let res = send(&chain, Method::GET).await;
    assert_eq!(res.header("x-middleware").unwrap(), "applied");
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_registrations_each_run() {
    let chain = Chain::new()
        .get(|req, _res, next| async move {
            req.set_header("x-count", "1");
            next.run().await;
            Ok(())
        })
        .get(|req, _res, next| async move {
            let count: u32 = req.header_str("x-count").and_then(|v| v.parse().ok()).unwrap_or(0);
            req.set_header("x-count", (count + 1).to_string());
            next.run().await;
            Ok(())
        })
        .get(terminal(|req, res| async move {
            res.end(req.header_str("x-count").unwrap_or_default())?;
            Ok(())
        }));

    assert_eq!(send(&chain, Method::GET).await.body(), "2");
}
