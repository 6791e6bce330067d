use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use crate::admin::permissions::{has_permission, Permission};
use crate::errors::AppError;
use crate::state::AppState;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// An authenticated admin. Extracting it rejects with 401 when the key is absent or wrong;
/// individual handlers then call [`Admin::require`] for their permission.
#[derive(Debug, Clone)]
pub struct Admin {
    permissions: Vec<Permission>,
}

impl Admin {
    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if has_permission(&self.permissions, permission) {
            Ok(())
        } else {
            warn!("Admin request refused: missing permission {permission}");
            Err(AppError::Forbidden(permission.to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Admin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(ADMIN_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        if !keys_match(presented.as_bytes(), state.config.admin_api_key.as_bytes()) {
            warn!("Admin request with invalid key on {}", parts.uri.path());
            return Err(AppError::Unauthorized);
        }

        Ok(Admin {
            permissions: state.config.admin_permissions.clone(),
        })
    }
}

/// Constant-time for equal-length inputs; the length itself is not secret.
fn keys_match(presented: &[u8], expected: &[u8]) -> bool {
    if presented.len() != expected.len() {
        return false;
    }
    presented
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_match() {
        assert!(keys_match(b"secret-key", b"secret-key"));
        assert!(!keys_match(b"secret-kez", b"secret-key"));
        assert!(!keys_match(b"secret", b"secret-key"));
        assert!(!keys_match(b"", b"secret-key"));
    }

    #[test]
    fn test_require_grants_and_refuses() {
        let admin = Admin {
            permissions: vec![Permission::ViewAnalyses],
        };
        assert!(admin.require(Permission::ViewAnalyses).is_ok());
        assert!(matches!(
            admin.require(Permission::ExportData),
            Err(AppError::Forbidden(p)) if p == "export_data"
        ));
    }
}
