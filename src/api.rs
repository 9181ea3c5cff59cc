use crate::{
    config::ApiConfig,
    data::student::{NewStudent, StudentRecord},
    error::{
        BouncerError, BouncerResult, BuildClientSnafu, DecodeResponseSnafu,
        MissingSessionCookieSnafu, NotLoggedInSnafu, RequestSnafu, UnexpectedStatusSnafu,
    },
};
use reqwest::{
    Client, Method, RequestBuilder, Response, StatusCode,
    header::{COOKIE, HeaderMap, SET_COOKIE},
    multipart::{Form, Part},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use snafu::{OptionExt, ResultExt};
use std::sync::Arc;

/// A CSV file picked in one of the upload overlays, checked and ready to forward.
#[derive(Debug, Clone)]
pub struct CsvUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl CsvUpload {
    fn into_form(self) -> BouncerResult<Form> {
        let part = Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str("text/csv")
            .context(BuildClientSnafu)?;
        Ok(Form::new().part("csv", part))
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct PasswordChange<'a> {
    old: &'a str,
    new: &'a str,
}

/// Typed access to the bouncer server's REST API.
#[derive(Debug, Clone)]
pub struct BouncerClient {
    client: Client,
    config: Arc<ApiConfig>,
}

impl BouncerClient {
    pub fn new(config: Arc<ApiConfig>) -> BouncerResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context(BuildClientSnafu)?;

        Ok(Self { client, config })
    }

    fn request(
        &self,
        method: Method,
        endpoint: &str,
        token: Option<&SecretString>,
    ) -> RequestBuilder {
        let builder = self.client.request(method, self.config.url_for(endpoint));
        match token {
            Some(token) => builder.header(COOKIE, token.expose_secret()),
            None => builder,
        }
    }

    async fn send(&self, endpoint: &str, builder: RequestBuilder) -> BouncerResult<Response> {
        debug!(?endpoint, "sending request");

        let response = builder.send().await.context(RequestSnafu { endpoint })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let body = body.trim().to_string();
        warn!(?endpoint, %status, ?body, "bouncer server rejected request");

        if status == StatusCode::UNAUTHORIZED {
            return NotLoggedInSnafu { message: body }.fail();
        }
        UnexpectedStatusSnafu {
            endpoint,
            status,
            body,
        }
        .fail()
    }

    async fn text(endpoint: &str, response: Response) -> BouncerResult<String> {
        response
            .text()
            .await
            .context(DecodeResponseSnafu { endpoint })
    }

    /// Logs in and hands back the session token: the cookies the server set, ready to be sent
    /// back as a `Cookie` header.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> BouncerResult<SecretString> {
        const ENDPOINT: &str = "/login";

        let builder = self.request(Method::POST, ENDPOINT, None).json(&Credentials {
            username,
            password: password.expose_secret(),
        });

        let response = match self.send(ENDPOINT, builder).await {
            Ok(response) => response,
            Err(BouncerError::NotLoggedIn { .. }) => return Err(BouncerError::InvalidCredentials),
            Err(e) => return Err(e),
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return UnexpectedStatusSnafu {
                endpoint: ENDPOINT,
                status,
                body,
            }
            .fail();
        }

        session_token_from(response.headers()).context(MissingSessionCookieSnafu)
    }

    pub async fn logout(&self, token: &SecretString) -> BouncerResult<()> {
        const ENDPOINT: &str = "/logout";

        self.send(ENDPOINT, self.request(Method::POST, ENDPOINT, Some(token)))
            .await?;
        Ok(())
    }

    pub async fn list_students(&self, token: &SecretString) -> BouncerResult<Vec<StudentRecord>> {
        const ENDPOINT: &str = "/api/users";

        self.send(ENDPOINT, self.request(Method::GET, ENDPOINT, Some(token)))
            .await?
            .json()
            .await
            .context(DecodeResponseSnafu { endpoint: ENDPOINT })
    }

    pub async fn add_student(
        &self,
        token: &SecretString,
        student: &NewStudent,
    ) -> BouncerResult<()> {
        const ENDPOINT: &str = "/api/users";

        let builder = self.request(Method::POST, ENDPOINT, Some(token)).json(student);
        self.send(ENDPOINT, builder).await?;
        Ok(())
    }

    pub async fn update_student(
        &self,
        token: &SecretString,
        id: i64,
        student: &NewStudent,
    ) -> BouncerResult<()> {
        let endpoint = format!("/api/users/{id}");

        let builder = self.request(Method::PUT, &endpoint, Some(token)).json(student);
        self.send(&endpoint, builder).await?;
        Ok(())
    }

    pub async fn delete_student(&self, token: &SecretString, id: i64) -> BouncerResult<()> {
        let endpoint = format!("/api/users/{id}");

        self.send(&endpoint, self.request(Method::DELETE, &endpoint, Some(token)))
            .await?;
        Ok(())
    }

    pub async fn upload_students(
        &self,
        token: &SecretString,
        upload: CsvUpload,
    ) -> BouncerResult<()> {
        const ENDPOINT: &str = "/api/users";

        let builder = self
            .request(Method::POST, ENDPOINT, Some(token))
            .multipart(upload.into_form()?);
        self.send(ENDPOINT, builder).await?;
        Ok(())
    }

    /// Returns whatever the server answered with, usually a CSV of ids and names.
    pub async fn bulk_decrypt(
        &self,
        token: &SecretString,
        upload: CsvUpload,
    ) -> BouncerResult<String> {
        const ENDPOINT: &str = "/api/bulk-decrypt";

        let builder = self
            .request(Method::POST, ENDPOINT, Some(token))
            .multipart(upload.into_form()?);
        let response = self.send(ENDPOINT, builder).await?;
        Self::text(ENDPOINT, response).await
    }

    pub async fn single_decrypt(
        &self,
        token: &SecretString,
        student_id: &str,
        encryption_code: &SecretString,
    ) -> BouncerResult<String> {
        const ENDPOINT: &str = "/api/single-decrypt";

        let form = Form::new()
            .text("studentId", student_id.to_string())
            .text("encryptionCode", encryption_code.expose_secret().to_string());
        let builder = self.request(Method::POST, ENDPOINT, Some(token)).multipart(form);
        let response = self.send(ENDPOINT, builder).await?;
        Self::text(ENDPOINT, response).await
    }

    /// A 401 here can mean either a dead session or a wrong current password, the server
    /// tells them apart by message.
    pub async fn change_password(
        &self,
        token: &SecretString,
        old: &SecretString,
        new: &SecretString,
    ) -> BouncerResult<()> {
        const ENDPOINT: &str = "/admin/pass";

        let builder = self
            .request(Method::POST, ENDPOINT, Some(token))
            .json(&PasswordChange {
                old: old.expose_secret(),
                new: new.expose_secret(),
            });

        match self.send(ENDPOINT, builder).await {
            Ok(_) => Ok(()),
            Err(BouncerError::NotLoggedIn { message })
                if message.contains("Invalid credentials") =>
            {
                Err(BouncerError::InvalidCredentials)
            }
            Err(e) => Err(e),
        }
    }
}

/// Collects the `name=value` part of every `Set-Cookie` header into one `Cookie` header value.
fn session_token_from(headers: &HeaderMap) -> Option<SecretString> {
    let pairs = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .filter(|pair| {
            pair.split_once('=')
                .is_some_and(|(name, value)| !name.is_empty() && !value.is_empty())
        })
        .collect::<Vec<_>>();

    if pairs.is_empty() {
        None
    } else {
        Some(SecretString::from(pairs.join("; ")))
    }
}
