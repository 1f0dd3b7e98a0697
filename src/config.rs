// src/config.rs
use crate::error::{AppError, AppResult};
use std::net::SocketAddr;

/// Tamanho mínimo exigido por `cookie::Key::from`.
const SESSION_SECRET_MIN_LEN: usize = 64;

/// Configuração da aplicação lida das variáveis de ambiente (após `dotenvy`).
///
/// | Variável                   | Padrão         |
/// |----------------------------|----------------|
/// | `DATABASE_URL`             | obrigatória    |
/// | `SESSION_SECRET`           | obrigatória    |
/// | `BIND_ADDR`                | `0.0.0.0:3000` |
/// | `COMISSAO_PERCENTUAL`      | `40`           |
/// | `VALOR_MENSALIDADE_PADRAO` | `100.0`        |
/// | `ADMIN_EMAIL` / `ADMIN_PASSWORD` | ausentes |
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub session_secret: String,
    pub bind_addr: SocketAddr,
    pub comissao_percentual: f64,
    pub valor_mensalidade_padrao: f64,
    pub admin_seed: Option<AdminSeed>,
}

#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let session_secret = std::env::var("SESSION_SECRET")?;
        if session_secret.len() < SESSION_SECRET_MIN_LEN {
            return Err(AppError::Config(format!(
                "SESSION_SECRET precisa de pelo menos {} caracteres",
                SESSION_SECRET_MIN_LEN
            )));
        }

        let bind_addr = parse_var("BIND_ADDR", "0.0.0.0:3000")?;
        let comissao_percentual: f64 = parse_var("COMISSAO_PERCENTUAL", "40")?;
        if !(0.0..=100.0).contains(&comissao_percentual) {
            return Err(AppError::Config(
                "COMISSAO_PERCENTUAL deve estar entre 0 e 100".into(),
            ));
        }
        let valor_mensalidade_padrao = parse_var("VALOR_MENSALIDADE_PADRAO", "100.0")?;

        let admin_seed = match (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Some(AdminSeed { email, password })
            }
            _ => None,
        };

        Ok(Self {
            database_url,
            session_secret,
            bind_addr,
            comissao_percentual,
            valor_mensalidade_padrao,
            admin_seed,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> AppResult<T> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} inválido: '{}'", name, raw)))
}
