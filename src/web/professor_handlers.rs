// src/web/professor_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{turma::Turma, user::Papel},
    services::{presenca_service, turma_service, user_service},
    state::AppState,
    templates::ProfessorDashboardPage,
    web::{
        ids_do_formulario, mw_auth::UsuarioAtual, redirect_erro, redirect_sucesso, renderizar,
        FeedbackParams,
    },
};
use axum::{
    extract::{Extension, Form, Path, Query, State},
    response::{Html, Redirect},
    Json,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

const PAINEL: &str = "/professor";

// Campos vazios do formulário chegam como string vazia
#[derive(Deserialize, Debug)]
pub struct MatricularForm {
    #[serde(default)]
    aluno_id: Option<String>,
    #[serde(default)]
    data_vencimento: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RemoverAlunoForm {
    #[serde(default)]
    aluno_id: Option<String>,
}

fn numero(campo: Option<&str>) -> Option<i64> {
    campo.and_then(|valor| valor.trim().parse().ok())
}

fn aluno_escolhido(campo: Option<&str>) -> AppResult<i64> {
    numero(campo).ok_or_else(|| AppError::ValidationMissing("Selecione um aluno!".into()))
}

/// A turma tem de existir e pertencer ao professor (o admin gere todas).
async fn turma_do_professor(
    db_pool: &SqlitePool,
    usuario: &UsuarioAtual,
    turma_id: i64,
) -> AppResult<Turma> {
    let turma = turma_service::find_turma(db_pool, turma_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Turma não encontrada.".into()))?;
    if !usuario.is_admin && turma.professor_id != usuario.id {
        tracing::warn!("{} tentou gerir a turma {} de outro professor", usuario.username, turma_id);
        return Err(AppError::Unauthorized);
    }
    Ok(turma)
}

// GET /professor
pub async fn professor_dashboard(
    State(state): State<AppState>,
    Extension(usuario): Extension<UsuarioAtual>,
    Query(params): Query<FeedbackParams>,
) -> AppResult<Html<String>> {
    tracing::debug!("GET /professor: painel de {}", usuario.username);

    let turmas = turma_service::listar_turmas_professor(&state.db_pool, usuario.id).await?;
    let todos_alunos = user_service::list_users_by_role(&state.db_pool, Papel::Aluno).await?;

    renderizar(&ProfessorDashboardPage {
        professor_nome: usuario.username,
        turmas,
        todos_alunos,
        hoje: Local::now().format("%d/%m/%Y").to_string(),
        success_message: params.success,
        error_message: params.error,
    })
}

// GET /get_alunos_turma/{turma_id}
pub async fn get_alunos_turma(
    State(state): State<AppState>,
    Extension(usuario): Extension<UsuarioAtual>,
    Path(turma_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let turma = turma_do_professor(&state.db_pool, &usuario, turma_id).await?;
    let alunos = turma_service::listar_alunos_turma(&state.db_pool, turma.id).await?;
    Ok(Json(json!({ "alunos": alunos })))
}

// POST /matricular/{turma_id}
pub async fn handle_matricular(
    State(state): State<AppState>,
    Extension(usuario): Extension<UsuarioAtual>,
    Path(turma_id): Path<i64>,
    Form(form): Form<MatricularForm>,
) -> AppResult<Redirect> {
    let dia_vencimento = numero(form.data_vencimento.as_deref());

    let resultado = async {
        let aluno_id = aluno_escolhido(form.aluno_id.as_deref())?;
        let turma = turma_do_professor(&state.db_pool, &usuario, turma_id).await?;
        turma_service::matricular_aluno(&state.db_pool, turma.id, aluno_id, dia_vencimento).await
    }
    .await;

    match resultado {
        Ok(_) => Ok(redirect_sucesso(PAINEL, "Aluno matriculado com sucesso!")),
        Err(e) => {
            tracing::warn!("Falha ao matricular {:?} na turma {}: {:?}", form.aluno_id, turma_id, e);
            Ok(redirect_erro(PAINEL, &e.user_message()))
        }
    }
}

// POST /remove_aluno/{turma_id}
pub async fn handle_remove_aluno(
    State(state): State<AppState>,
    Extension(usuario): Extension<UsuarioAtual>,
    Path(turma_id): Path<i64>,
    Form(form): Form<RemoverAlunoForm>,
) -> AppResult<Redirect> {
    let resultado = async {
        let aluno_id = aluno_escolhido(form.aluno_id.as_deref())?;
        let turma = turma_do_professor(&state.db_pool, &usuario, turma_id).await?;
        turma_service::remover_aluno(&state.db_pool, turma.id, aluno_id).await
    }
    .await;

    match resultado {
        Ok(()) => Ok(redirect_sucesso(PAINEL, "Aluno removido da turma.")),
        Err(e) => {
            tracing::warn!("Falha ao remover {:?} da turma {}: {:?}", form.aluno_id, turma_id, e);
            Ok(redirect_erro(PAINEL, &e.user_message()))
        }
    }
}

/// POST /salvar_chamada/{turma_id}. Checkboxes `alunos_presenca` repetidos;
/// a chamada fica registada com a data de hoje.
pub async fn handle_salvar_chamada(
    State(state): State<AppState>,
    Extension(usuario): Extension<UsuarioAtual>,
    Path(turma_id): Path<i64>,
    Form(pares): Form<Vec<(String, String)>>,
) -> AppResult<Redirect> {
    let presentes = ids_do_formulario(&pares, "alunos_presenca");
    let hoje = Local::now().date_naive();

    let resultado = async {
        let turma = turma_do_professor(&state.db_pool, &usuario, turma_id).await?;
        presenca_service::salvar_chamada(&state.db_pool, turma.id, &presentes, hoje).await
    }
    .await;

    match resultado {
        Ok(gravadas) => {
            let presentes = gravadas.iter().filter(|p| p.presente).count();
            tracing::debug!(
                "Chamada da turma {}: {} de {} presente(s).",
                turma_id,
                presentes,
                gravadas.len()
            );
            Ok(redirect_sucesso(PAINEL, "Chamada salva com sucesso!"))
        }
        Err(e) => {
            tracing::error!("Erro ao salvar chamada da turma {}: {:?}", turma_id, e);
            Ok(redirect_erro(PAINEL, &e.user_message()))
        }
    }
}
