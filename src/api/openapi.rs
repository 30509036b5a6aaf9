use super::handlers::{
    ErrorMessage, SessionEnvelope, UserEnvelope, ValidationErrorBody, health, login, logout, me,
    register, unregister,
};
use crate::account::{FieldErrors, LoginRequest, RegisterRequest, Session, User};
use utoipa::{
    Modify, OpenApi,
    openapi::{
        Components,
        security::{Http, HttpAuthScheme, SecurityScheme},
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        register::register,
        login::login,
        logout::logout,
        unregister::unregister,
        me::me,
    ),
    components(schemas(
        health::Health,
        LoginRequest,
        RegisterRequest,
        Session,
        User,
        FieldErrors,
        ErrorMessage,
        ValidationErrorBody,
        SessionEnvelope,
        UserEnvelope,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Registration, login and bearer token lifecycle"),
        (name = "health", description = "Service and account store health"),
    )
)]
struct ApiDoc;

/// Registers the `bearer` scheme referenced by the authenticated routes.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi
            .components
            .get_or_insert_with(Components::new)
            .add_security_scheme("bearer", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn openapi_documents_every_route() -> Result<()> {
        let doc = serde_json::to_value(openapi())?;
        for (path, method) in [
            ("/health", "get"),
            ("/register", "post"),
            ("/login", "post"),
            ("/logout", "post"),
            ("/unregister", "post"),
            ("/me", "get"),
        ] {
            assert!(
                doc["paths"][path][method].is_object(),
                "missing {method} {path}"
            );
        }
        Ok(())
    }

    #[test]
    fn openapi_uses_cargo_metadata_and_bearer_scheme() -> Result<()> {
        let doc = serde_json::to_value(openapi())?;
        assert_eq!(doc["info"]["title"], env!("CARGO_PKG_NAME"));
        assert_eq!(doc["info"]["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(
            doc["components"]["securitySchemes"]["bearer"]["scheme"],
            "bearer"
        );
        assert!(doc["paths"]["/me"]["get"]["security"].is_array());
        Ok(())
    }
}
