//! Route modules: the service proxies the browser calls directly, and the
//! hosted quest session.

use axum::Router;
use tracing::Span;
use tracing::field::display;
use uuid::Uuid;

use crate::state::AppState;

pub mod chat;
pub mod health;
pub mod quest;
pub mod tts;
pub mod verify;

/// Routes mounted under `/api`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(chat::router())
        .merge(verify::router())
        .merge(tts::router())
        .nest("/quest", quest::router())
}

/// A fresh correlation id, recorded on the current route span. The span
/// must declare an empty `correlation_id` field.
pub(crate) fn correlate() -> Uuid {
    let correlation_id = Uuid::new_v4();
    Span::current().record("correlation_id", display(correlation_id));
    correlation_id
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_correlation_id_is_recorded_on_the_route_span() {
        // Arrange
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();

        // Act
        let correlation_id = tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("chat", correlation_id = tracing::field::Empty);
            let _entered = span.enter();
            let correlation_id = correlate();
            tracing::info!("chat reply relayed");
            correlation_id
        });

        // Assert
        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains(&format!("correlation_id={correlation_id}")));
        assert_ne!(correlate(), correlation_id);
    }
}
