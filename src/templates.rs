// src/templates.rs
use crate::models::{
    financeiro::{ContaPagar, MensalidadeDetalhe, RelatorioProfessor, ResumoFinanceiro},
    presenca::PresencaHistorico,
    turma::{HistoricoMatricula, TurmaComAlunos, TurmaResumo},
    user::UserResumo,
};
use askama::Template;

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage {
    pub logado: bool,
}

/// Quadro público de turmas ativas.
#[derive(Template)]
#[template(path = "horarios.html")]
pub struct HorariosPage {
    pub turmas: Vec<TurmaResumo>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub error: Option<String>,
    pub success: Option<String>,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterPage {
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "admin_dashboard.html")]
pub struct AdminDashboardPage {
    pub admin_nome: String,
    pub alunos: Vec<UserResumo>,
    pub professores: Vec<UserResumo>,
    pub turmas: Vec<TurmaResumo>,
    pub contas: Vec<ContaPagar>,
    pub mensalidades: Vec<MensalidadeDetalhe>,
    pub resumo: ResumoFinanceiro,
    pub valor_padrao: f64,
    pub mes_atual: String,
    pub success_message: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Template)]
#[template(path = "professor_dashboard.html")]
pub struct ProfessorDashboardPage {
    pub professor_nome: String,
    pub turmas: Vec<TurmaComAlunos>,
    pub todos_alunos: Vec<UserResumo>,
    pub hoje: String,
    pub success_message: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Template)]
#[template(path = "aluno_dashboard.html")]
pub struct AlunoDashboardPage {
    pub aluno_id: i64,
    pub aluno_nome: String,
    pub mensalidades: Vec<MensalidadeDetalhe>,
    pub frequencia: f64,
    pub historico: Vec<PresencaHistorico>,
}

#[derive(Template)]
#[template(path = "historico_presenca.html")]
pub struct HistoricoPresencaPage {
    pub aluno_nome: String,
    pub historico: Vec<PresencaHistorico>,
    pub frequencia: f64,
    pub matriculas: Vec<HistoricoMatricula>,
}

#[derive(Template)]
#[template(path = "relatorio_financeiro_professor.html")]
pub struct RelatorioProfessorPage {
    pub relatorio: Vec<RelatorioProfessor>,
    pub mes: Option<String>,
    pub percentual: f64,
}
