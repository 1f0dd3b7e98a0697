// src/web/mw_admin.rs
use crate::{error::AppError, web::mw_auth::UsuarioAtual};
use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
};

/// Exige `is_admin`. Corre depois de `require_auth`.
pub async fn require_admin(
    Extension(usuario): Extension<UsuarioAtual>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if usuario.is_admin {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("Admin MW: acesso negado para {}.", usuario.username);
        Err(AppError::Unauthorized)
    }
}

/// Exige papel de professor (ou admin). Corre depois de `require_auth`.
pub async fn require_professor(
    Extension(usuario): Extension<UsuarioAtual>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if usuario.pode_lecionar() {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("Professor MW: acesso negado para {}.", usuario.username);
        Err(AppError::Unauthorized)
    }
}
