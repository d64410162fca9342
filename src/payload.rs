//! Request bodies for create and update: JSON objects or multipart forms.

use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header, StatusCode};
use axum::{async_trait, Json};
use serde_json::{Map, Value};

use crate::uploads::UploadedImage;
use crate::utils::error::AppError;

/// Form part that may carry the event image.
pub const IMAGE_FIELD: &str = "image";

/// Text fields of the request plus the optional image part.
#[derive(Debug, Default)]
pub struct EventForm {
    pub fields: Map<String, Value>,
    pub image: Option<UploadedImage>,
}

#[async_trait]
impl<S> FromRequest<S> for EventForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::ValidationError(e.body_text()))?;
            read_multipart(multipart).await
        } else if content_type.starts_with("application/json") {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| match e.status() {
                    StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(e.body_text()),
                    _ => AppError::ValidationError(e.body_text()),
                })?;
            match value {
                Value::Object(fields) => Ok(Self {
                    fields,
                    image: None,
                }),
                _ => Err(AppError::ValidationError(
                    "Request body must be a JSON object".to_string(),
                )),
            }
        } else {
            Ok(Self::default())
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<EventForm, AppError> {
    let mut form = EventForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if field.file_name().is_none() {
            let text = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, Value::String(text));
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        // Browsers send an empty part when no file was picked.
        if bytes.is_empty() {
            continue;
        }

        if name != IMAGE_FIELD {
            return Err(AppError::ValidationError(format!(
                "Unexpected file field '{}'",
                name
            )));
        }
        if form.image.is_some() {
            return Err(AppError::ValidationError(
                "Only one image may be uploaded".to_string(),
            ));
        }
        if content_type
            .as_deref()
            .is_some_and(|ct| !ct.starts_with("image/"))
        {
            return Err(AppError::ValidationError(
                "Only image uploads are allowed".to_string(),
            ));
        }

        form.image = Some(UploadedImage {
            file_name,
            content_type,
            bytes,
        });
    }

    Ok(form)
}

fn multipart_error(e: MultipartError) -> AppError {
    match e.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(e.body_text()),
        _ => AppError::ValidationError(e.body_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    const BOUNDARY: &str = "X-EVENTS-BOUNDARY";

    fn multipart_request(parts: &[(&str, Option<(&str, &str)>, &str)]) -> Request {
        let mut body = String::new();
        for (name, file, value) in parts {
            body.push_str(&format!("--{}\r\n", BOUNDARY));
            match file {
                Some((file_name, content_type)) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    name, file_name, content_type
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    name
                )),
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));

        HttpRequest::builder()
            .method("POST")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_multipart_fields_and_image() {
        let req = multipart_request(&[
            ("name", None, "Launch"),
            ("rigor_rank", None, "4"),
            ("image", Some(("cover.png", "image/png")), "PNGDATA"),
        ]);

        let form = EventForm::from_request(req, &()).await.unwrap();
        assert_eq!(form.fields["name"], Value::String("Launch".into()));
        assert_eq!(form.fields["rigor_rank"], Value::String("4".into()));

        let image = form.image.unwrap();
        assert_eq!(image.file_name.as_deref(), Some("cover.png"));
        assert_eq!(&image.bytes[..], b"PNGDATA");
    }

    #[tokio::test]
    async fn test_multipart_rejects_other_files() {
        let req = multipart_request(&[("attachment", Some(("a.png", "image/png")), "x")]);
        let err = EventForm::from_request(req, &()).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(msg) if msg.contains("attachment")));

        let req = multipart_request(&[("image", Some(("a.pdf", "application/pdf")), "x")]);
        assert!(EventForm::from_request(req, &()).await.is_err());
    }

    #[tokio::test]
    async fn test_multipart_empty_file_is_ignored() {
        let req = multipart_request(&[
            ("name", None, "Launch"),
            ("image", Some(("", "application/octet-stream")), ""),
        ]);
        let form = EventForm::from_request(req, &()).await.unwrap();
        assert_eq!(form.fields.len(), 1);
        assert!(form.image.is_none());
    }

    #[tokio::test]
    async fn test_json_body() {
        let req = HttpRequest::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"A","rigor_rank":3}"#))
            .unwrap();

        let form = EventForm::from_request(req, &()).await.unwrap();
        assert_eq!(form.fields["rigor_rank"], Value::from(3));
        assert!(form.image.is_none());

        let req = HttpRequest::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("[1,2]"))
            .unwrap();
        assert!(EventForm::from_request(req, &()).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_body_is_empty() {
        let req = HttpRequest::builder()
            .method("PUT")
            .body(Body::empty())
            .unwrap();
        let form = EventForm::from_request(req, &()).await.unwrap();
        assert!(form.fields.is_empty());
    }
}
