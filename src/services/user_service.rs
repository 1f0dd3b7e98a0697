// src/services/user_service.rs
use crate::{
    error::{falha_transacao, AppError, AppResult},
    models::user::{Papel, RegisterForm, User, UserResumo},
    services::auth_service,
};
use chrono::NaiveDate;
use sqlx::{Sqlite, SqlitePool, Transaction};

const USERNAME_ADMIN: &str = "Administrador";

/// Busca um utilizador pelo ID.
pub async fn find_user_by_id(db_pool: &SqlitePool, user_id: i64) -> AppResult<Option<User>> {
    tracing::debug!("Buscando utilizador por ID: {}", user_id);
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?;
    Ok(user)
}

pub async fn find_user_by_email(db_pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
    tracing::debug!("Buscando utilizador por e-mail: {}", email);
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?1")
        .bind(email)
        .fetch_optional(db_pool)
        .await?;
    Ok(user)
}

/// Lista utilizadores de um papel, por nome.
pub async fn list_users_by_role(db_pool: &SqlitePool, role: Papel) -> AppResult<Vec<UserResumo>> {
    let users = sqlx::query_as::<_, UserResumo>(
        "SELECT id, username, email, role, is_admin FROM users WHERE role = ?1 ORDER BY username ASC",
    )
    .bind(role)
    .fetch_all(db_pool)
    .await?;
    tracing::debug!("Encontrados {} utilizadores com papel {}.", users.len(), role);
    Ok(users)
}

/// Campos de texto vazios do formulário viram NULL.
fn campo(valor: &Option<String>) -> Option<String> {
    valor
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Verifica username e e-mail dentro da transação, antes do INSERT.
async fn garantir_unico(
    tx: &mut Transaction<'_, Sqlite>,
    username: &str,
    email: Option<&str>,
) -> AppResult<()> {
    let username_existe: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)")
            .bind(username)
            .fetch_one(&mut **tx)
            .await
            .map_err(falha_transacao)?;
    if username_existe {
        tracing::warn!("Cadastro rejeitado: username '{}' já existe.", username);
        return Err(AppError::Duplicate(
            "Este nome de usuário já está em uso. Escolha outro.".into(),
        ));
    }

    if let Some(email) = email {
        let email_existe: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)")
                .bind(email)
                .fetch_one(&mut **tx)
                .await
                .map_err(falha_transacao)?;
        if email_existe {
            tracing::warn!("Cadastro rejeitado: e-mail '{}' já existe.", email);
            return Err(AppError::Duplicate(
                "Este e-mail já está cadastrado em outra conta.".into(),
            ));
        }
    }
    Ok(())
}

/// Traduz violação de UNIQUE (cadastro concorrente) em `Duplicate`.
fn erro_insert_usuario(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Duplicate("Nome de usuário ou e-mail já cadastrado.".into())
        }
        _ => falha_transacao(e),
    }
}

/// Cadastro público: cria um aluno aprovado automaticamente.
pub async fn register_user(db_pool: &SqlitePool, form: &RegisterForm) -> AppResult<i64> {
    let username = form.username.trim();
    tracing::info!("Tentando cadastrar utilizador: {}", username);

    if username.is_empty() {
        return Err(AppError::ValidationMissing("Informe um nome de usuário.".into()));
    }
    if form.password.is_empty() {
        return Err(AppError::ValidationMissing("Informe uma senha.".into()));
    }
    let email = campo(&form.email);

    // Data inválida é ignorada, como campo não preenchido
    let data_nascimento = campo(&form.data_nascimento)
        .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok());

    let password_hash = auth_service::hash_password(&form.password).await?;

    let mut tx = db_pool.begin().await.map_err(falha_transacao)?;
    garantir_unico(&mut tx, username, email.as_deref()).await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (
            username, email, password_hash, role, is_approved, is_admin,
            data_nascimento, sexo, profissao,
            endereco, numero_endereco, bairro, cidade, estado, cep,
            contato_1, contato_2, contato_emergencia, nome_contato_emergencia,
            antecedentes_cirurgicos, tratamentos_medicamentosos, antecedentes_alergicos,
            funcionamento_intestino, pratica_atividade_fisica, indicacoes_observacoes
        )
        VALUES (?1, ?2, ?3, ?4, 1, 0, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(&email)
    .bind(&password_hash)
    .bind(Papel::Aluno)
    .bind(data_nascimento)
    .bind(campo(&form.sexo))
    .bind(campo(&form.profissao))
    .bind(campo(&form.endereco))
    .bind(campo(&form.numero_endereco))
    .bind(campo(&form.bairro))
    .bind(campo(&form.cidade))
    .bind(campo(&form.estado))
    .bind(campo(&form.cep))
    .bind(campo(&form.contato_1))
    .bind(campo(&form.contato_2))
    .bind(campo(&form.contato_emergencia))
    .bind(campo(&form.nome_contato_emergencia))
    .bind(campo(&form.antecedentes_cirurgicos))
    .bind(campo(&form.tratamentos_medicamentosos))
    .bind(campo(&form.antecedentes_alergicos))
    .bind(form.funcionamento_intestino.is_some())
    .bind(form.pratica_atividade_fisica.is_some())
    .bind(campo(&form.indicacoes_observacoes))
    .fetch_one(&mut *tx)
    .await
    .map_err(erro_insert_usuario)?;

    tx.commit().await.map_err(falha_transacao)?;
    tracing::info!("✅ Utilizador '{}' cadastrado (id {}).", username, id);
    Ok(id)
}

async fn inserir_professor(
    db_pool: &SqlitePool,
    nome: &str,
    email: &str,
    senha: &str,
    is_admin: bool,
) -> AppResult<i64> {
    let password_hash = auth_service::hash_password(senha).await?;

    let mut tx = db_pool.begin().await.map_err(falha_transacao)?;
    garantir_unico(&mut tx, nome, Some(email)).await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (username, email, password_hash, role, is_approved, is_admin)
        VALUES (?1, ?2, ?3, ?4, 1, ?5)
        RETURNING id
        "#,
    )
    .bind(nome)
    .bind(email)
    .bind(&password_hash)
    .bind(Papel::Professor)
    .bind(is_admin)
    .fetch_one(&mut *tx)
    .await
    .map_err(erro_insert_usuario)?;

    tx.commit().await.map_err(falha_transacao)?;
    Ok(id)
}

/// Cadastro de professor pelo admin.
pub async fn cadastrar_professor(
    db_pool: &SqlitePool,
    nome: &str,
    email: &str,
    senha: &str,
) -> AppResult<i64> {
    let (nome, email) = (nome.trim(), email.trim());
    if nome.is_empty() || email.is_empty() || senha.is_empty() {
        return Err(AppError::ValidationMissing("Preencha todos os campos!".into()));
    }
    tracing::info!("Cadastrando professor(a) {}", nome);
    let id = inserir_professor(db_pool, nome, email, senha, false).await?;
    tracing::info!("✅ Professor(a) '{}' cadastrado(a) (id {}).", nome, id);
    Ok(id)
}

/// Cria o administrador configurado, se o e-mail ainda não existir.
/// Devolve `true` quando criou.
pub async fn seed_admin(db_pool: &SqlitePool, email: &str, senha: &str) -> AppResult<bool> {
    if find_user_by_email(db_pool, email).await?.is_some() {
        tracing::debug!("Administrador '{}' já existe.", email);
        return Ok(false);
    }
    let username = username_admin_livre(db_pool, email).await?;
    inserir_professor(db_pool, &username, email, senha, true).await?;
    tracing::info!("👤 Administrador '{}' criado com o usuário '{}'.", email, username);
    Ok(true)
}

/// "Administrador" quando livre; senão o próprio e-mail, que é único.
async fn username_admin_livre(db_pool: &SqlitePool, email: &str) -> AppResult<String> {
    for candidato in [USERNAME_ADMIN, email] {
        let em_uso: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)")
                .bind(candidato)
                .fetch_one(db_pool)
                .await?;
        if !em_uso {
            return Ok(candidato.to_string());
        }
        tracing::warn!("Usuário '{}' já existe, tentando outro para o administrador.", candidato);
    }
    Err(AppError::Duplicate(
        "Não há nome de usuário livre para o administrador.".into(),
    ))
}

/// Remove um utilizador e tudo o que o referencia, numa única transação.
pub async fn rejeitar_usuario(db_pool: &SqlitePool, user_id: i64) -> AppResult<String> {
    let mut tx = db_pool.begin().await.map_err(falha_transacao)?;

    let username: Option<String> = sqlx::query_scalar("SELECT username FROM users WHERE id = ?1")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(falha_transacao)?;
    let Some(username) = username else {
        return Err(AppError::NotFound("Usuário não encontrado.".into()));
    };

    let leciona: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM turmas WHERE professor_id = ?1)")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(falha_transacao)?;
    if leciona {
        return Err(AppError::ValidationMissing(
            "Este professor ainda tem turmas cadastradas e não pode ser removido.".into(),
        ));
    }

    for sql in [
        "DELETE FROM presencas WHERE user_id = ?1",
        "DELETE FROM matriculas WHERE user_id = ?1",
        "DELETE FROM historico_matriculas WHERE aluno_id = ?1",
        "DELETE FROM mensalidades WHERE aluno_id = ?1 OR professor_id = ?1",
        "DELETE FROM users WHERE id = ?1",
    ] {
        sqlx::query(sql)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(falha_transacao)?;
    }

    tx.commit().await.map_err(falha_transacao)?;
    tracing::info!("Utilizador '{}' (id {}) removido.", username, user_id);
    Ok(username)
}
