// src/error.rs
use axum::{http::StatusCode, response::Html, response::IntoResponse};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Erro na base de dados: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Erro de migração da base de dados: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Erro de variável de ambiente: {0}")]
    EnvVarError(#[from] std::env::VarError),

    #[error("Configuração inválida: {0}")]
    Config(String),

    #[error("Erro ao processar senha")]
    PasswordHashingError,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Erro na sessão: {0}")]
    SessionError(String),

    /// Registo já existente (username, e-mail, matrícula, mensalidade).
    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    NotFound(String),

    /// Campo obrigatório ausente ou inválido.
    #[error("{0}")]
    ValidationMissing(String),

    /// Falha do banco durante uma transação; nada foi gravado.
    #[error("Falha na transação, nenhuma alteração foi gravada")]
    TransactionFailure,

    #[error("Erro interno inesperado")]
    InternalServerError,

    #[error("Não autorizado")]
    Unauthorized,
}

impl AppError {
    /// Mensagem segura para mostrar ao utilizador (sem detalhes internos).
    pub fn user_message(&self) -> String {
        match self {
            AppError::Duplicate(msg)
            | AppError::NotFound(msg)
            | AppError::ValidationMissing(msg) => msg.clone(),
            AppError::TransactionFailure => {
                "Ocorreu um erro ao salvar os dados. Tente novamente.".to_string()
            }
            AppError::InvalidCredentials => "E-mail ou senha incorretos!".to_string(),
            AppError::Unauthorized => "Acesso negado!".to_string(),
            AppError::SqlxError(_) | AppError::SqlxMigrateError(_) => {
                "Erro ao aceder aos dados.".to_string()
            }
            AppError::EnvVarError(_) | AppError::Config(_) => "Erro de configuração.".to_string(),
            AppError::PasswordHashingError => "Erro ao processar credenciais.".to_string(),
            AppError::SessionError(_) => "Erro na gestão da sua sessão.".to_string(),
            AppError::InternalServerError => "Ocorreu um erro inesperado.".to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Duplicate(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationMissing(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!("Erro processado: {:?}", self);

        let status = self.status_code();
        let user_message = self.user_message();

        (status, Html(format!(r#"
            <!DOCTYPE html><html><head><title>Erro</title><style>body{{font-family:sans-serif;}}</style></head>
            <body><h1>Erro {status_code}</h1><p>{message}</p><a href="javascript:history.back()">Voltar</a></body></html>
         "#, status_code = status.as_u16(), message = user_message))).into_response()
    }
}

pub type AppResult<T = ()> = Result<T, AppError>;

/// Converte erros do banco dentro de uma transação em `TransactionFailure`,
/// preservando os erros de domínio.
pub fn falha_transacao(e: sqlx::Error) -> AppError {
    tracing::error!("Erro do banco durante transação: {:?}", e);
    AppError::TransactionFailure
}
