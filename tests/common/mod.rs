#![allow(dead_code)]

use http::Method;
use muxchain::dispatcher::{HandlerRequest, HandlerResponse};
use muxchain::router::Router;

pub mod test_tracing {
    use std::io;
    use std::sync::{Arc, Mutex, Once};
    use tracing_subscriber::EnvFilter;

    static INIT: Once = Once::new();

    /// Install a test-writer subscriber once per test binary.
    ///
    /// Honors `RUST_LOG`; defaults to `warn` so test output stays readable.
    pub fn init() {
        INIT.call_once(|| {
            let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_test_writer()
                .try_init();
        });
    }

    /// Shared in-memory sink for formatted log lines.
    #[derive(Clone, Default)]
    pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Capture everything logged on this thread until the guard drops.
    pub fn capture() -> (tracing::subscriber::DefaultGuard, CapturedLogs) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        (tracing::subscriber::set_default(subscriber), logs)
    }
}

pub fn get(router: &Router, target: &str) -> HandlerResponse {
    router
        .dispatch(HandlerRequest::new(Method::GET, target))
        .unwrap()
}

pub fn request(router: &Router, method: Method, target: &str) -> HandlerResponse {
    router.dispatch(HandlerRequest::new(method, target)).unwrap()
}

pub fn body_text(resp: &HandlerResponse) -> &str {
    resp.body.as_str().unwrap_or("")
}
