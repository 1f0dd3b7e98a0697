// src/web/mod.rs
pub mod admin_handlers;
pub mod aluno_handlers;
pub mod auth_handlers;
pub mod mw_admin;
pub mod mw_auth;
pub mod professor_handlers;
pub mod routes;

use crate::error::{AppError, AppResult};
use askama::Template;
use axum::response::{Html, Redirect};
use serde::Deserialize;

/// Mensagens de retorno passadas na query string (padrão Post/Redirect/Get).
#[derive(Deserialize, Debug, Default)]
pub struct FeedbackParams {
    pub success: Option<String>,
    pub error: Option<String>,
}

pub fn redirect_sucesso(destino: &str, mensagem: &str) -> Redirect {
    Redirect::to(&format!("{}?success={}", destino, urlencoding::encode(mensagem)))
}

pub fn redirect_erro(destino: &str, mensagem: &str) -> Redirect {
    Redirect::to(&format!("{}?error={}", destino, urlencoding::encode(mensagem)))
}

/// Renderiza um template Askama; falhas de render viram erro interno.
pub fn renderizar<T: Template>(template: &T) -> AppResult<Html<String>> {
    match template.render() {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            tracing::error!("Falha ao renderizar template: {}", e);
            Err(AppError::InternalServerError)
        }
    }
}

/// Valores de um campo repetido (`nome` ou `nome[]`) convertidos para ids.
/// Entradas não numéricas são descartadas.
pub fn ids_do_formulario(pares: &[(String, String)], nome: &str) -> Vec<i64> {
    let com_colchetes = format!("{nome}[]");
    pares
        .iter()
        .filter(|(chave, _)| chave == nome || *chave == com_colchetes)
        .filter_map(|(_, valor)| valor.trim().parse().ok())
        .collect()
}

/// Primeiro valor de um campo simples.
pub fn campo_do_formulario<'a>(pares: &'a [(String, String)], nome: &str) -> Option<&'a str> {
    pares
        .iter()
        .find(|(chave, _)| chave == nome)
        .map(|(_, valor)| valor.as_str())
}
