// src/web/admin_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::user::Papel,
    services::{conta_service, mensalidade_service, relatorio_service, turma_service, user_service},
    state::AppState,
    templates::{AdminDashboardPage, RelatorioProfessorPage},
    web::{
        campo_do_formulario, ids_do_formulario, mw_auth::UsuarioAtual, redirect_erro,
        redirect_sucesso, renderizar, FeedbackParams,
    },
};
use axum::{
    extract::{Extension, Form, Path, Query, State},
    response::{Html, Redirect},
};
use chrono::Local;
use serde::Deserialize;

const PAINEL: &str = "/admin";

fn id_escolhido(campo: Option<&str>) -> Option<i64> {
    campo.and_then(|id| id.trim().parse().ok())
}

/// Valor em reais; aceita vírgula decimal. `None` quando o campo vem vazio.
fn valor_informado(campo: Option<&str>) -> AppResult<Option<f64>> {
    match campo.map(str::trim) {
        None | Some("") => Ok(None),
        Some(bruto) => bruto
            .replace(',', ".")
            .parse::<f64>()
            .map(Some)
            .map_err(|_| AppError::ValidationMissing("Valor inválido.".into())),
    }
}

// --- Structs para os Formulários ---
#[derive(Deserialize, Debug)]
pub struct CadastrarProfessorForm {
    nome: String,
    email: String,
    senha: String,
}

#[derive(Deserialize, Debug)]
pub struct CriarTurmaForm {
    nome: String,
    // O select envia "" quando nenhum professor é escolhido
    #[serde(default)]
    professor_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ContaForm {
    descricao: String,
    valor: String,
    vencimento: String,
}

// Selects vazios chegam como ""; valor vazio usa o padrão configurado
#[derive(Deserialize, Debug)]
pub struct CriarMensalidadeForm {
    #[serde(default)]
    aluno_id: Option<String>,
    #[serde(default)]
    turma_id: Option<String>,
    mes_referencia: String,
    #[serde(default)]
    valor: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RelatorioParams {
    mes: Option<String>,
}

// --- Handlers ---

/// GET /admin - painel com turmas, utilizadores e financeiro.
pub async fn admin_dashboard(
    State(state): State<AppState>,
    Extension(usuario): Extension<UsuarioAtual>,
    Query(params): Query<FeedbackParams>,
) -> AppResult<Html<String>> {
    tracing::debug!("GET /admin: carregando painel...");
    let pool = &state.db_pool;

    let alunos = user_service::list_users_by_role(pool, Papel::Aluno).await?;
    let professores = user_service::list_users_by_role(pool, Papel::Professor).await?;
    let turmas = turma_service::listar_turmas_resumo(pool).await?;
    let contas = conta_service::listar_contas(pool).await?;
    let mensalidades = mensalidade_service::listar_mensalidades(pool).await?;
    let resumo = conta_service::resumo_financeiro(pool).await?;

    renderizar(&AdminDashboardPage {
        admin_nome: usuario.username,
        alunos,
        professores,
        turmas,
        contas,
        mensalidades,
        resumo,
        valor_padrao: state.config.valor_mensalidade_padrao,
        mes_atual: Local::now().format("%Y-%m").to_string(),
        success_message: params.success,
        error_message: params.error,
    })
}

// POST /admin/rejeitar/{id}
pub async fn handle_rejeitar(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Redirect> {
    match user_service::rejeitar_usuario(&state.db_pool, user_id).await {
        Ok(username) => Ok(redirect_sucesso(
            PAINEL,
            &format!("Usuário '{}' removido.", username),
        )),
        Err(e) => {
            tracing::warn!("Falha ao remover utilizador {}: {:?}", user_id, e);
            Ok(redirect_erro(PAINEL, &e.user_message()))
        }
    }
}

// POST /cadastrar_professor
pub async fn handle_cadastrar_professor(
    State(state): State<AppState>,
    Form(form): Form<CadastrarProfessorForm>,
) -> AppResult<Redirect> {
    match user_service::cadastrar_professor(&state.db_pool, &form.nome, &form.email, &form.senha)
        .await
    {
        Ok(_) => Ok(redirect_sucesso(PAINEL, "Professor cadastrado com sucesso!")),
        Err(e) => {
            tracing::warn!("Falha ao cadastrar professor {}: {:?}", form.email, e);
            Ok(redirect_erro(PAINEL, &e.user_message()))
        }
    }
}

// POST /criar_turma
pub async fn handle_criar_turma(
    State(state): State<AppState>,
    Form(form): Form<CriarTurmaForm>,
) -> AppResult<Redirect> {
    let professor_id = id_escolhido(form.professor_id.as_deref());

    match turma_service::criar_turma(&state.db_pool, &form.nome, professor_id).await {
        Ok(turma) => Ok(redirect_sucesso(
            PAINEL,
            &format!("Turma '{}' criada com sucesso!", turma.nome),
        )),
        Err(e) => {
            tracing::warn!("Falha ao criar turma '{}': {:?}", form.nome, e);
            Ok(redirect_erro(PAINEL, &e.user_message()))
        }
    }
}

// POST /alterar_status_turma/{id}
pub async fn handle_alterar_status_turma(
    State(state): State<AppState>,
    Path(turma_id): Path<i64>,
) -> AppResult<Redirect> {
    match turma_service::alterar_status_turma(&state.db_pool, turma_id).await {
        Ok(turma) => {
            let estado = if turma.ativa { "reativada" } else { "arquivada" };
            Ok(redirect_sucesso(PAINEL, &format!("Turma '{}' {}.", turma.nome, estado)))
        }
        Err(e) => Ok(redirect_erro(PAINEL, &e.user_message())),
    }
}

/// POST /gerar_mensalidades_lote. `alunos_ids` vem repetido, um por checkbox.
pub async fn handle_gerar_mensalidades_lote(
    State(state): State<AppState>,
    Form(pares): Form<Vec<(String, String)>>,
) -> AppResult<Redirect> {
    let alunos = ids_do_formulario(&pares, "alunos_ids");
    let mes = campo_do_formulario(&pares, "mes_referencia").unwrap_or_default();
    let valor = match valor_informado(campo_do_formulario(&pares, "valor")) {
        Ok(valor) => valor.unwrap_or(state.config.valor_mensalidade_padrao),
        Err(e) => return Ok(redirect_erro(PAINEL, &e.user_message())),
    };

    match mensalidade_service::gerar_mensalidades_lote(&state.db_pool, &alunos, mes, valor).await {
        Ok(criadas) => Ok(redirect_sucesso(
            PAINEL,
            &format!("{} mensalidade(s) gerada(s) para {}.", criadas, mes.trim()),
        )),
        Err(e) => {
            tracing::warn!("Falha ao gerar mensalidades de {}: {:?}", mes, e);
            Ok(redirect_erro(PAINEL, &e.user_message()))
        }
    }
}

// POST /criar_mensalidade
pub async fn handle_criar_mensalidade(
    State(state): State<AppState>,
    Form(form): Form<CriarMensalidadeForm>,
) -> AppResult<Redirect> {
    let resultado = async {
        let (Some(aluno_id), Some(turma_id)) = (
            id_escolhido(form.aluno_id.as_deref()),
            id_escolhido(form.turma_id.as_deref()),
        ) else {
            return Err(AppError::ValidationMissing("Selecione o aluno e a turma!".into()));
        };
        let valor = valor_informado(form.valor.as_deref())?
            .unwrap_or(state.config.valor_mensalidade_padrao);
        mensalidade_service::criar_mensalidade(
            &state.db_pool,
            aluno_id,
            turma_id,
            &form.mes_referencia,
            valor,
        )
        .await
    }
    .await;

    match resultado {
        Ok(mensalidade) => {
            tracing::info!(
                "Mensalidade {} lançada: aluno {} turma {} ({})",
                mensalidade.id,
                mensalidade.aluno_id,
                mensalidade.turma_id,
                mensalidade.mes
            );
            Ok(redirect_sucesso(
                PAINEL,
                &format!("Mensalidade de {} lançada.", mensalidade.mes),
            ))
        }
        Err(e) => {
            tracing::warn!("Falha ao lançar mensalidade {:?}: {:?}", form, e);
            Ok(redirect_erro(PAINEL, &e.user_message()))
        }
    }
}

// POST /marcar_pago_mensalidade/{id}
pub async fn handle_marcar_pago_mensalidade(
    State(state): State<AppState>,
    Path(mensalidade_id): Path<i64>,
) -> AppResult<Redirect> {
    match mensalidade_service::marcar_mensalidade_paga(&state.db_pool, mensalidade_id).await {
        Ok(()) => Ok(redirect_sucesso(PAINEL, "Mensalidade marcada como paga.")),
        Err(e) => Ok(redirect_erro(PAINEL, &e.user_message())),
    }
}

// POST /marcar_pago_conta/{id}
pub async fn handle_marcar_pago_conta(
    State(state): State<AppState>,
    Path(conta_id): Path<i64>,
) -> AppResult<Redirect> {
    match conta_service::marcar_conta_paga(&state.db_pool, conta_id).await {
        Ok(()) => Ok(redirect_sucesso(PAINEL, "Conta marcada como paga.")),
        Err(e) => Ok(redirect_erro(PAINEL, &e.user_message())),
    }
}

// POST /adicionar_conta
pub async fn handle_adicionar_conta(
    State(state): State<AppState>,
    Form(form): Form<ContaForm>,
) -> AppResult<Redirect> {
    match conta_service::adicionar_conta(&state.db_pool, &form.descricao, &form.valor, &form.vencimento)
        .await
    {
        Ok(_) => Ok(redirect_sucesso(PAINEL, "Conta adicionada com sucesso!")),
        Err(e) => {
            tracing::warn!("Falha ao adicionar conta '{}': {:?}", form.descricao, e);
            Ok(redirect_erro(PAINEL, &e.user_message()))
        }
    }
}

/// GET /relatorio_financeiro_professor?mes=AAAA-MM
pub async fn relatorio_financeiro_professor(
    State(state): State<AppState>,
    Query(params): Query<RelatorioParams>,
) -> AppResult<Html<String>> {
    let mes = params
        .mes
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());
    let percentual = state.config.comissao_percentual;

    let relatorio =
        relatorio_service::relatorio_comissoes(&state.db_pool, mes.as_deref(), percentual).await?;

    renderizar(&RelatorioProfessorPage {
        relatorio,
        mes,
        percentual,
    })
}
