// src/web/aluno_handlers.rs
use crate::{
    error::{AppError, AppResult},
    services::{mensalidade_service, presenca_service, turma_service, user_service},
    state::AppState,
    templates::{AlunoDashboardPage, HistoricoPresencaPage},
    web::{mw_auth::UsuarioAtual, renderizar},
};
use axum::{
    extract::{Extension, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};

// GET /aluno
pub async fn aluno_dashboard(
    State(state): State<AppState>,
    Extension(usuario): Extension<UsuarioAtual>,
) -> AppResult<Response> {
    // Professores têm o seu próprio painel
    if usuario.pode_lecionar() {
        let destino = if usuario.is_admin { "/admin" } else { "/professor" };
        return Ok(Redirect::to(destino).into_response());
    }

    let mensalidades = mensalidade_service::mensalidades_do_aluno(&state.db_pool, usuario.id).await?;
    let frequencia = presenca_service::frequencia_aluno(&state.db_pool, usuario.id).await?;
    let historico = presenca_service::historico_presenca(&state.db_pool, usuario.id).await?;

    let template = AlunoDashboardPage {
        aluno_id: usuario.id,
        aluno_nome: usuario.username,
        mensalidades,
        frequencia,
        historico,
    };
    Ok(renderizar(&template)?.into_response())
}

/// GET /historico_presenca/{aluno_id}. Alunos só veem o próprio histórico.
pub async fn historico_presenca(
    State(state): State<AppState>,
    Extension(usuario): Extension<UsuarioAtual>,
    Path(aluno_id): Path<i64>,
) -> AppResult<Html<String>> {
    if !usuario.pode_lecionar() && usuario.id != aluno_id {
        tracing::warn!("{} tentou ver o histórico do aluno {}", usuario.username, aluno_id);
        return Err(AppError::Unauthorized);
    }

    let aluno = user_service::find_user_by_id(&state.db_pool, aluno_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Aluno não encontrado.".into()))?;

    let historico = presenca_service::historico_presenca(&state.db_pool, aluno.id).await?;
    let frequencia = presenca_service::frequencia_aluno(&state.db_pool, aluno.id).await?;
    let matriculas = turma_service::historico_matriculas(&state.db_pool, aluno.id).await?;

    renderizar(&HistoricoPresencaPage {
        aluno_nome: aluno.username,
        historico,
        frequencia,
        matriculas,
    })
}
