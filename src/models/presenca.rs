// src/models/presenca.rs
use chrono::NaiveDate;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Presenca {
    pub id: i64,
    pub user_id: i64,
    pub turma_id: i64,
    pub data_aula: NaiveDate,
    pub presente: bool,
}

/// Linha do histórico de presença de um aluno, com o nome da turma.
#[derive(Debug, Clone, FromRow)]
pub struct PresencaHistorico {
    pub data_aula: NaiveDate,
    pub turma: String,
    pub presente: bool,
}
