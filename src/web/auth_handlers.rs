// src/web/auth_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::user::{LoginForm, RegisterForm},
    services::{auth_service, turma_service, user_service},
    state::AppState,
    templates::{HomePage, HorariosPage, LoginPage, RegisterPage},
    web::{mw_auth::SESSION_USER_KEY, redirect_erro, redirect_sucesso, renderizar, FeedbackParams},
};
use axum::{
    extract::{Form, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

async fn sessao_ativa(session: &Session) -> Option<i64> {
    session.get::<i64>(SESSION_USER_KEY).await.ok().flatten()
}

// GET /
pub async fn show_home(session: Session) -> AppResult<Response> {
    let logado = sessao_ativa(&session).await.is_some();
    Ok(renderizar(&HomePage { logado })?.into_response())
}

// GET /horarios
pub async fn show_horarios(State(state): State<AppState>) -> AppResult<Html<String>> {
    let turmas = turma_service::listar_turmas_resumo(&state.db_pool)
        .await?
        .into_iter()
        .filter(|t| t.ativa)
        .collect();
    renderizar(&HorariosPage { turmas })
}

// GET /login
pub async fn show_login_form(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<FeedbackParams>,
) -> AppResult<Response> {
    if let Some(user_id) = sessao_ativa(&session).await {
        if let Some(user) = user_service::find_user_by_id(&state.db_pool, user_id).await? {
            let destino = auth_service::destino_pos_login(&user);
            tracing::debug!("GET /login: utilizador já logado, redirecionando para {}", destino);
            return Ok(Redirect::to(destino).into_response());
        }
    }

    let template = LoginPage {
        error: params.error,
        success: params.success,
    };
    Ok(renderizar(&template)?.into_response())
}

// POST /login
pub async fn handle_login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    tracing::info!("Tentativa de login para: {}", form.email);

    let user = match auth_service::autenticar(&state.db_pool, &form.email, &form.password).await {
        Ok(user) => user,
        Err(AppError::InvalidCredentials) => {
            tracing::warn!("Credenciais inválidas para: {}", form.email);
            let template = LoginPage {
                error: Some(AppError::InvalidCredentials.user_message()),
                success: None,
            };
            return Ok(renderizar(&template)?.into_response());
        }
        Err(e) => {
            tracing::error!("Erro ao autenticar {}: {:?}", form.email, e);
            return Err(e);
        }
    };

    // Novo ID de sessão a cada login
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao rodar ID: {}", e)))?;
    session
        .insert(SESSION_USER_KEY, user.id)
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao inserir na sessão: {}", e)))?;

    tracing::info!("✅ Login bem-sucedido para: {}", user.username);
    Ok(Redirect::to(auth_service::destino_pos_login(&user)).into_response())
}

// GET /logout
pub async fn handle_logout(session: Session) -> AppResult<Redirect> {
    let user_id = sessao_ativa(&session).await;

    session
        .delete()
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao apagar sessão: {}", e)))?;

    match user_id {
        Some(id) => tracing::info!("🚪 Utilizador {} desligado.", id),
        None => tracing::info!("🚪 Sessão anónima desligada."),
    }
    Ok(Redirect::to("/login"))
}

// GET /register
pub async fn show_register_form(Query(params): Query<FeedbackParams>) -> AppResult<Response> {
    let template = RegisterPage { error: params.error };
    Ok(renderizar(&template)?.into_response())
}

// POST /register
pub async fn handle_register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Redirect> {
    tracing::info!("POST /register: cadastro de '{}'", form.username.trim());

    match user_service::register_user(&state.db_pool, &form).await {
        Ok(id) => {
            tracing::info!("Aluno {} cadastrado.", id);
            Ok(redirect_sucesso("/login", "Cadastro realizado com sucesso! Faça login."))
        }
        Err(e @ (AppError::Duplicate(_) | AppError::ValidationMissing(_))) => {
            tracing::warn!("Cadastro recusado: {:?}", e);
            Ok(redirect_erro("/register", &e.user_message()))
        }
        Err(e) => {
            tracing::error!("Erro ao cadastrar aluno: {:?}", e);
            Ok(redirect_erro("/register", &e.user_message()))
        }
    }
}
