// src/web/mw_auth.rs
use crate::{
    error::AppError,
    models::user::{Papel, User},
    services::user_service,
    state::AppState,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

pub const SESSION_USER_KEY: &str = "user_id";

/// Utilizador autenticado, posto nas extensões por `require_auth`.
#[derive(Clone, Debug)]
pub struct UsuarioAtual {
    pub id: i64,
    pub username: String,
    pub role: Papel,
    pub is_admin: bool,
}

impl UsuarioAtual {
    pub fn pode_lecionar(&self) -> bool {
        self.is_admin || self.role == Papel::Professor
    }
}

impl From<User> for UsuarioAtual {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            is_admin: user.is_admin,
        }
    }
}

// Middleware que verifica se o utilizador está logado
pub async fn require_auth(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = session
        .get::<i64>(SESSION_USER_KEY)
        .await
        .map_err(|e| AppError::SessionError(format!("Erro ao verificar sessão: {}", e)))?;

    let Some(user_id) = user_id else {
        tracing::debug!("Autenticação MW: sem user_id. Redirecionando para /login");
        return Ok(Redirect::to("/login").into_response());
    };

    match user_service::find_user_by_id(&state.db_pool, user_id).await? {
        Some(user) => {
            tracing::debug!("Autenticação MW: utilizador {} autenticado.", user.username);
            request.extensions_mut().insert(UsuarioAtual::from(user));
            Ok(next.run(request).await)
        }
        None => {
            // Conta removida com sessão ainda aberta
            tracing::warn!("Autenticação MW: user_id {} já não existe. Limpando sessão.", user_id);
            session
                .flush()
                .await
                .map_err(|e| AppError::SessionError(format!("Falha ao limpar sessão: {}", e)))?;
            Ok(Redirect::to("/login").into_response())
        }
    }
}
