//! Walk semantics: continuation, finalization, halting and error mode.

use http::{Method, StatusCode};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use stitch_chain::{terminal, Chain};
use stitch_core::{ChainError, Request, Response};

async fn send(chain: &Chain, method: Method) -> Response {
    let res = Response::new();
    chain.handle(Request::new(method, "/"), res.clone()).await;
    res
}

#[tokio::test]
async fn all_next_chain_answers_not_found() {
    let chain = Chain::new()
        .all(|_req, _res, next| async move {
            next.run().await;
            Ok(())
        })
        .get(|_req, _res, next| async move {
            next.run().await;
            Ok(())
        });

    let res = send(&chain, Method::GET).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.body(), "Not Found");
}

#[tokio::test]
async fn stale_next_after_finalization_is_ignored() {
    let reached = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&reached);

    let chain = Chain::new()
        .get(|_req, res, next| async move {
            res.end("first")?;
            next.run().await;
            Ok(())
        })
        .get(move |_req, res, _next| {
            let flag = Arc::clone(&flag);
            async move {
                *flag.lock() = true;
                res.end("second")?;
                Ok(())
            }
        });

    let res = send(&chain, Method::GET).await;
    assert_eq!(res.body(), "first");
    assert_eq!(res.status(), StatusCode::OK);
    assert!(!*reached.lock());
}

#[tokio::test]
async fn layers_share_request_state() {
    #[derive(Clone)]
    struct Value(u32);

    let chain = Chain::new()
        .all(|req, _res, next| async move {
            req.insert(Value(1));
            next.run().await;
            Ok(())
        })
        .get(|req, res, _next| async move {
            let value = req.get::<Value>().map_or(0, |v| v.0);
            res.end(value.to_string())?;
            Ok(())
        });

    assert_eq!(send(&chain, Method::GET).await.body(), "1");
}

#[tokio::test]
async fn dropping_next_halts_the_walk() {
    let chain = Chain::new()
        .all(|_req, res, next| async move {
            drop(next);
            res.set_header("x-halted", "yes")?;
            Ok(())
        })
        .all(terminal(|_req, res| async move {
            res.end("unreachable")?;
            Ok(())
        }));

    let res = send(&chain, Method::GET).await;
    assert!(!res.is_finished());
    assert_eq!(res.header("x-halted").unwrap(), "yes");
    assert!(res.body().is_empty());
}

#[tokio::test]
async fn next_can_be_called_from_another_task() {
    let chain = Chain::new()
        .all(|_req, _res, next| async move {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                next.run().await;
            });
            Ok(())
        })
        .get(terminal(|_req, res| async move {
            res.end("later")?;
            Ok(())
        }));

    let res = send(&chain, Method::GET).await;
    tokio::time::timeout(Duration::from_secs(1), res.finished())
        .await
        .expect("spawned continuation should finish the response");
    assert_eq!(res.body(), "later");
}

#[tokio::test]
async fn returned_error_skips_normal_layers() {
    let chain = Chain::new()
        .get(|_req, _res, _next| async move { Err(ChainError::msg("e")) })
        .all(|_req, res, _next| async move {
            res.set_header("x-skipped", "no")?;
            res.end("normal")?;
            Ok(())
        })
        .error(|err, _req, res, _next| async move {
            res.end(err.message())?;
            Ok(())
        });

    let res = send(&chain, Method::GET).await;
    assert_eq!(res.body(), "e");
    assert!(res.header("x-skipped").is_none());
}

#[tokio::test]
async fn explicit_fail_reaches_error_layer() {
    let chain = Chain::new()
        .get(|_req, _res, next| async move {
            next.fail(std::io::Error::other("disk full")).await;
            Ok(())
        })
        .error(|err, _req, res, _next| async move {
            assert!(err.downcast_ref::<std::io::Error>().is_some());
            res.send_text(StatusCode::INSUFFICIENT_STORAGE, err.message())?;
            Ok(())
        });

    let res = send(&chain, Method::GET).await;
    assert_eq!(res.status(), StatusCode::INSUFFICIENT_STORAGE);
    assert_eq!(res.body(), "disk full");
}

#[tokio::test]
async fn unhandled_error_answers_internal_server_error() {
    let chain = Chain::new()
        .get(|_req, _res, _next| async move { Err(anyhow::anyhow!("secret detail").into()) });

    let res = send(&chain, Method::GET).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body(), "Internal Server Error");
}

#[tokio::test]
async fn panics_are_routed_to_error_layers() {
    let chain = Chain::new()
        .get(|_req, _res, _next| async move {
            if std::hint::black_box(true) {
                panic!("kaboom");
            }
            Ok(())
        })
        .error(|err, _req, res, _next| async move {
            assert!(err.is_panic());
            res.end(err.message())?;
            Ok(())
        });

    let res = send(&chain, Method::GET).await;
    assert_eq!(res.body(), "kaboom");
}

#[tokio::test]
async fn error_handler_run_resolves_the_error() {
    let chain = Chain::new()
        .get(|_req, _res, _next| async move { Err(ChainError::msg("recoverable")) })
        .error(|_err, _req, res, next| async move {
            res.set_header("x-recovered", "true")?;
            next.run().await;
            Ok(())
        })
        .get(terminal(|_req, res| async move {
            res.end("resumed")?;
            Ok(())
        }));

    let res = send(&chain, Method::GET).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body(), "resumed");
    assert_eq!(res.header("x-recovered").unwrap(), "true");
}

#[tokio::test]
async fn error_handler_fail_keeps_propagating() {
    let chain = Chain::new()
        .get(|_req, _res, _next| async move { Err(ChainError::msg("first")) })
        .error(|err, _req, _res, next| async move {
            next.fail(format!("{} then second", err.message())).await;
            Ok(())
        })
        .all(terminal(|_req, res| async move {
            res.end("skipped")?;
            Ok(())
        }))
        .error(|err, _req, res, _next| async move {
            res.end(err.message())?;
            Ok(())
        });

    assert_eq!(send(&chain, Method::GET).await.body(), "first then second");
}

#[tokio::test]
async fn error_layers_respect_method_filter() {
    let chain = Chain::new()
        .all(|_req, _res, _next| async move { Err(ChainError::msg("boom")) })
        .error_on(Method::POST, |_err, _req, res, _next| async move {
            res.end("post error handler")?;
            Ok(())
        })
        .error(|_err, _req, res, _next| async move {
            res.end("generic error handler")?;
            Ok(())
        });

    assert_eq!(send(&chain, Method::POST).await.body(), "post error handler");
    assert_eq!(send(&chain, Method::GET).await.body(), "generic error handler");
}

#[tokio::test]
async fn failure_after_next_is_dropped() {
    let chain = Chain::new()
        .get(|_req, _res, next| async move {
            next.run().await;
            Err(ChainError::msg("too late"))
        })
        .get(terminal(|_req, res| async move {
            res.end("ok")?;
            Ok(())
        }))
        .error(|_err, _req, res, _next| async move {
            res.end("should not run")?;
            Ok(())
        });

    let res = send(&chain, Method::GET).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body(), "ok");
}

#[tokio::test]
async fn partially_written_response_is_ended_on_exhaustion() {
    let chain = Chain::new().get(|_req, res, next| async move {
        res.set_status(StatusCode::ACCEPTED)?;
        res.write("partial")?;
        next.run().await;
        Ok(())
    });

    let res = send(&chain, Method::GET).await;
    assert!(res.is_finished());
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    assert_eq!(res.body(), "partial");
}

#[tokio::test]
async fn concurrent_requests_walk_independently() {
    let chain = Chain::new()
        .all(|req, _res, next| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            req.set_header("x-seen", "1");
            next.run().await;
            Ok(())
        })
        .get(terminal(|req, res| async move {
            res.end(req.path().to_string())?;
            Ok(())
        }));

    let mut tasks = Vec::new();
    for i in 0..16 {
        let chain = chain.clone();
        tasks.push(tokio::spawn(async move {
            let res = Response::new();
            let path = format!("/{i}");
            chain.handle(Request::new(Method::GET, &path), res.clone()).await;
            (path, res.body())
        }));
    }

    for task in tasks {
        let (path, body) = task.await.unwrap();
        assert_eq!(body, path.as_bytes());
    }
}
