// src/models/turma.rs
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Turma {
    pub id: i64,
    pub nome: String,
    pub professor_id: i64,
    pub ativa: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct Matricula {
    pub id: i64,
    pub user_id: i64,
    pub turma_id: i64,
    pub data_matricula: NaiveDateTime,
    pub data_vencimento: Option<i64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct HistoricoMatricula {
    pub id: i64,
    pub aluno_id: i64,
    pub turma_id: i64,
    pub turma_nome: String,
    pub data_acao: NaiveDateTime,
    pub acao: String,
}

/// Linha do painel do admin: turma com contagem de alunos e inadimplentes.
#[derive(Debug, Clone, FromRow)]
pub struct TurmaResumo {
    pub id: i64,
    pub nome: String,
    pub ativa: bool,
    pub professor_nome: String,
    pub total_alunos: i64,
    pub inadimplentes: i64,
}

/// Aluno matriculado, como devolvido por `GET /get_alunos_turma/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct AlunoMatriculado {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub data_matricula: String,
    pub vencimento: Option<i64>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct AlunoMatriculadoRow {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub data_matricula: NaiveDateTime,
    pub data_vencimento: Option<i64>,
}

impl From<AlunoMatriculadoRow> for AlunoMatriculado {
    fn from(row: AlunoMatriculadoRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            data_matricula: row.data_matricula.format("%d/%m/%Y").to_string(),
            vencimento: row.data_vencimento,
        }
    }
}

/// Turma de um professor com os alunos para a chamada.
#[derive(Debug, Clone)]
pub struct TurmaComAlunos {
    pub turma: Turma,
    pub alunos: Vec<AlunoMatriculado>,
}
