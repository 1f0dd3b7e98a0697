// src/models/user.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Papel de um utilizador na escola.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Papel {
    Aluno,
    Professor,
}

impl Papel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Papel::Aluno => "aluno",
            Papel::Professor => "professor",
        }
    }
}

impl fmt::Display for Papel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Representa um utilizador lido da tabela 'users'
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Papel,
    pub is_approved: bool,
    pub is_admin: bool,

    pub data_nascimento: Option<NaiveDate>,
    pub sexo: Option<String>,
    pub profissao: Option<String>,

    pub endereco: Option<String>,
    pub numero_endereco: Option<String>,
    pub bairro: Option<String>,
    pub cidade: Option<String>,
    pub estado: Option<String>,
    pub cep: Option<String>,

    pub contato_1: Option<String>,
    pub contato_2: Option<String>,
    pub contato_emergencia: Option<String>,
    pub nome_contato_emergencia: Option<String>,

    pub antecedentes_cirurgicos: Option<String>,
    pub tratamentos_medicamentosos: Option<String>,
    pub antecedentes_alergicos: Option<String>,
    pub funcionamento_intestino: Option<bool>,
    pub pratica_atividade_fisica: Option<bool>,
    pub indicacoes_observacoes: Option<String>,
}

impl User {
    pub fn is_professor(&self) -> bool {
        self.role == Papel::Professor
    }
}

/// Versão leve para listagens (sem hash nem ficha de saúde).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserResumo {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: Papel,
    pub is_admin: bool,
}

// Struct para dados do formulário de login
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Formulário de cadastro público. Todos os campos de perfil são opcionais;
/// checkboxes chegam como `Some(_)` quando marcados.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,

    #[serde(default)]
    pub data_nascimento: Option<String>,
    #[serde(default)]
    pub sexo: Option<String>,
    #[serde(default)]
    pub profissao: Option<String>,

    #[serde(default)]
    pub endereco: Option<String>,
    #[serde(default)]
    pub numero_endereco: Option<String>,
    #[serde(default)]
    pub bairro: Option<String>,
    #[serde(default)]
    pub cidade: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default)]
    pub cep: Option<String>,

    #[serde(default)]
    pub contato_1: Option<String>,
    #[serde(default)]
    pub contato_2: Option<String>,
    #[serde(default)]
    pub contato_emergencia: Option<String>,
    #[serde(default)]
    pub nome_contato_emergencia: Option<String>,

    #[serde(default)]
    pub antecedentes_cirurgicos: Option<String>,
    #[serde(default)]
    pub tratamentos_medicamentosos: Option<String>,
    #[serde(default)]
    pub antecedentes_alergicos: Option<String>,
    #[serde(default)]
    pub funcionamento_intestino: Option<String>,
    #[serde(default)]
    pub pratica_atividade_fisica: Option<String>,
    #[serde(default)]
    pub indicacoes_observacoes: Option<String>,
}
