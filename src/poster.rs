use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Больше этого постер не качаем.
const MAX_POSTER_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum PosterError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("body exceeds {0} bytes")]
    TooLarge(usize),
    #[error("not a decodable image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("decoder task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Проверка ссылки на постер: картинка должна скачаться и декодироваться.
#[derive(Clone)]
pub struct PosterValidator {
    http: Client,
    max_bytes: usize,
}

impl PosterValidator {
    pub fn new(timeout: Duration) -> Result<Self, PosterError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; tg-movie-catalog/0.1)")
            .build()?;
        Ok(Self { http, max_bytes: MAX_POSTER_BYTES })
    }

    /// Любая ошибка (сеть, таймаут, статус, битые байты) означает «невалидно».
    pub async fn is_valid(&self, url: &str) -> bool {
        match self.check(url).await {
            Ok(()) => {
                debug!(url, "poster accepted");
                true
            }
            Err(e) => {
                warn!(url, error = %e, "poster rejected");
                false
            }
        }
    }

    async fn check(&self, url: &str) -> Result<(), PosterError> {
        let bytes = self.fetch(url).await?;
        tokio::task::spawn_blocking(move || image::load_from_memory(&bytes)).await??;
        Ok(())
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PosterError> {
        let mut resp = self
            .http
            .get(url)
            .header(header::ACCEPT, "image/*")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(PosterError::Status(resp.status()));
        }
        if resp.content_length().is_some_and(|len| len > self.max_bytes as u64) {
            return Err(PosterError::TooLarge(self.max_bytes));
        }
        // Content-Length может не быть или врать, поэтому считаем сами
        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(PosterError::TooLarge(self.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_bytes() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(2, 2));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn validator(timeout_ms: u64) -> PosterValidator {
        PosterValidator::new(Duration::from_millis(timeout_ms)).unwrap()
    }

    #[tokio::test]
    async fn accepts_decodable_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/poster.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
            .mount(&server)
            .await;

        let url = format!("{}/poster.png", server.uri());
        assert!(validator(2_000).is_valid(&url).await);
    }

    #[tokio::test]
    async fn rejects_non_image_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let url = format!("{}/page.html", server.uri());
        assert!(!validator(2_000).is_valid(&url).await);
    }

    #[tokio::test]
    async fn rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.png"))
            .respond_with(ResponseTemplate::new(404).set_body_bytes(png_bytes()))
            .mount(&server)
            .await;

        let url = format!("{}/gone.png", server.uri());
        assert!(!validator(2_000).is_valid(&url).await);
    }

    #[tokio::test]
    async fn slow_response_counts_as_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(png_bytes())
                    .set_delay(Duration::from_millis(1_500)),
            )
            .mount(&server)
            .await;

        let url = format!("{}/slow.png", server.uri());
        assert!(!validator(200).is_valid(&url).await);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/huge.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
            .mount(&server)
            .await;

        let url = format!("{}/huge.png", server.uri());
        let small = PosterValidator { max_bytes: 16, ..validator(2_000) };
        assert!(!small.is_valid(&url).await);
        assert!(matches!(small.check(&url).await, Err(PosterError::TooLarge(16))));
        assert!(validator(2_000).is_valid(&url).await);
    }

    #[tokio::test]
    async fn rejects_garbage_url() {
        assert!(!validator(500).is_valid("not a url").await);
    }
}
