// src/models/financeiro.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Estado de uma mensalidade ou conta a pagar. Só transita Pendente -> Pago.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum StatusPagamento {
    Pendente,
    Pago,
}

impl StatusPagamento {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusPagamento::Pendente => "Pendente",
            StatusPagamento::Pago => "Pago",
        }
    }
}

impl fmt::Display for StatusPagamento {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Mensalidade {
    pub id: i64,
    pub aluno_id: i64,
    pub turma_id: i64,
    pub professor_id: i64,
    pub mes: String,
    pub valor: f64,
    pub status: StatusPagamento,
    pub data_matricula: NaiveDate,
}

/// Mensalidade com nomes resolvidos, para os painéis.
#[derive(Debug, Clone, FromRow)]
pub struct MensalidadeDetalhe {
    pub id: i64,
    pub aluno: String,
    pub turma: String,
    pub mes: String,
    pub valor: f64,
    pub status: StatusPagamento,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContaPagar {
    pub id: i64,
    pub descricao: String,
    pub valor: f64,
    pub vencimento: NaiveDate,
    pub status: StatusPagamento,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResumoFinanceiro {
    pub total_pagar: f64,
    pub total_receber: f64,
    pub saldo_estimado: f64,
}

/// Uma linha do join mensalidade x aluno x professor x turma.
#[derive(Debug, Clone, FromRow)]
pub struct LinhaComissao {
    pub professor: String,
    pub aluno: String,
    pub turma: String,
    pub mes: String,
    pub valor: f64,
    pub status: StatusPagamento,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRelatorio {
    pub aluno: String,
    pub turma: String,
    pub mes: String,
    pub valor: f64,
    pub status: StatusPagamento,
}

/// Bloco do relatório de comissões para um professor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatorioProfessor {
    pub professor: String,
    pub alunos: Vec<ItemRelatorio>,
    pub total_recebido: f64,
    pub comissao: f64,
}
