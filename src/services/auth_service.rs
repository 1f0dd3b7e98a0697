// src/services/auth_service.rs
use crate::{
    error::{AppError, AppResult},
    models::user::User,
    services::user_service,
};
use sqlx::SqlitePool;

/// Verifica se a senha fornecida corresponde ao hash guardado.
pub async fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(&password, &stored_hash))
        .await
        .map_err(|e| {
            tracing::error!("Erro na task spawn_blocking (verify_password): {:?}", e);
            AppError::InternalServerError
        })?
        .map_err(|e| {
            tracing::error!("Erro bcrypt ao verificar senha: {:?}", e);
            AppError::PasswordHashingError
        })
}

/// Gera um hash bcrypt para uma senha.
pub async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| {
            tracing::error!("Erro na task spawn_blocking (hash_password): {:?}", e);
            AppError::InternalServerError
        })?
        .map_err(|e| {
            tracing::error!("Erro bcrypt ao gerar hash: {:?}", e);
            AppError::PasswordHashingError
        })
}

/// Login por e-mail. Utilizador inexistente e senha errada dão o mesmo erro.
pub async fn autenticar(db_pool: &SqlitePool, email: &str, password: &str) -> AppResult<User> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::InvalidCredentials);
    }

    let Some(user) = user_service::find_user_by_email(db_pool, email).await? else {
        tracing::warn!("Login falhou: e-mail '{}' não cadastrado.", email);
        return Err(AppError::InvalidCredentials);
    };

    if verify_password(password, &user.password_hash).await? {
        tracing::info!("✅ Login bem-sucedido para: {}", user.username);
        Ok(user)
    } else {
        tracing::warn!("Senha incorreta para: {}", email);
        Err(AppError::InvalidCredentials)
    }
}

/// Página inicial de cada perfil depois do login.
pub fn destino_pos_login(user: &User) -> &'static str {
    if user.is_admin {
        "/admin"
    } else if user.is_professor() {
        "/professor"
    } else {
        "/aluno"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::RegisterForm;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("namaste").await.unwrap();
        assert!(verify_password("namaste", &hash).await.unwrap());
        assert!(!verify_password("outra", &hash).await.unwrap());
    }

    #[sqlx::test]
    async fn autenticar_por_email(pool: SqlitePool) {
        let form = RegisterForm {
            username: "ana".into(),
            email: Some("ana@gaia.com".into()),
            password: "segredo".into(),
            ..Default::default()
        };
        user_service::register_user(&pool, &form).await.unwrap();

        let user = autenticar(&pool, "ana@gaia.com", "segredo").await.unwrap();
        assert_eq!(user.username, "ana");
        assert_eq!(destino_pos_login(&user), "/aluno");

        assert!(matches!(
            autenticar(&pool, "ana@gaia.com", "errada").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            autenticar(&pool, "ninguem@gaia.com", "segredo").await,
            Err(AppError::InvalidCredentials)
        ));
    }
}
