use crate::app::print_notice;
use anyhow::{bail, Result};
use quill_client::{Backend, Notice, NoticeContext};
use tracing::info;

pub async fn run(backend: &dyn Backend, url: &str) -> Result<()> {
    match backend.health().await {
        Ok(()) => {
            info!("Backend at {} is healthy", url);
            println!("Backend at {url} is up");
            Ok(())
        },
        Err(error) => {
            print_notice(&Notice::from_error(&error, NoticeContext::General));
            bail!("Backend at {url} is not answering")
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_client::mock::{MockBackend, MockFailure};

    #[tokio::test]
    async fn reports_an_unreachable_backend() {
        let backend = MockBackend::new();
        run(&backend, "http://localhost:8000").await.unwrap();

        backend.fail_next_request(MockFailure::Unreachable);
        let error = run(&backend, "http://localhost:8000").await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "Backend at http://localhost:8000 is not answering"
        );
    }
}
