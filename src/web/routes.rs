// src/web/routes.rs
use crate::{
    state::AppState,
    web::{admin_handlers, aluno_handlers, auth_handlers, mw_admin, mw_auth, professor_handlers},
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub fn create_router(app_state: AppState) -> Router {
    // --- Rotas Públicas ---
    let public_routes = Router::new()
        .route("/", get(auth_handlers::show_home))
        .route("/horarios", get(auth_handlers::show_horarios))
        .route(
            "/register",
            get(auth_handlers::show_register_form).post(auth_handlers::handle_register),
        )
        .route("/login", get(auth_handlers::show_login_form).post(auth_handlers::handle_login));

    // --- Rotas de Admin ---
    // mw_auth é aplicado no router pai
    let admin_routes = Router::new()
        .route("/admin", get(admin_handlers::admin_dashboard))
        .route("/admin/rejeitar/{id}", post(admin_handlers::handle_rejeitar))
        .route("/cadastrar_professor", post(admin_handlers::handle_cadastrar_professor))
        .route("/criar_turma", post(admin_handlers::handle_criar_turma))
        .route("/alterar_status_turma/{id}", post(admin_handlers::handle_alterar_status_turma))
        .route("/gerar_mensalidades_lote", post(admin_handlers::handle_gerar_mensalidades_lote))
        .route("/criar_mensalidade", post(admin_handlers::handle_criar_mensalidade))
        .route(
            "/marcar_pago_mensalidade/{id}",
            post(admin_handlers::handle_marcar_pago_mensalidade),
        )
        .route("/marcar_pago_conta/{id}", post(admin_handlers::handle_marcar_pago_conta))
        .route("/adicionar_conta", post(admin_handlers::handle_adicionar_conta))
        .route(
            "/relatorio_financeiro_professor",
            get(admin_handlers::relatorio_financeiro_professor),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            mw_admin::require_admin,
        ));

    // --- Rotas de Professor ---
    let professor_routes = Router::new()
        .route("/professor", get(professor_handlers::professor_dashboard))
        .route("/get_alunos_turma/{turma_id}", get(professor_handlers::get_alunos_turma))
        .route("/matricular/{turma_id}", post(professor_handlers::handle_matricular))
        .route("/remove_aluno/{turma_id}", post(professor_handlers::handle_remove_aluno))
        .route("/salvar_chamada/{turma_id}", post(professor_handlers::handle_salvar_chamada))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            mw_admin::require_professor,
        ));

    // --- Rotas Autenticadas ---
    // require_auth corre antes dos guards de papel acima
    let authenticated_routes = Router::new()
        .route("/logout", get(auth_handlers::handle_logout))
        .route("/aluno", get(aluno_handlers::aluno_dashboard))
        .route(
            "/historico_presenca/{aluno_id}",
            get(aluno_handlers::historico_presenca),
        )
        .merge(admin_routes)
        .merge(professor_routes)
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            mw_auth::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        models::user::RegisterForm,
        services::{turma_service, user_service},
    };
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use sqlx::SqlitePool;
    use std::sync::Arc;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    fn build_test_app(pool: SqlitePool) -> Router {
        let config = AppConfig {
            database_url: "sqlite::memory:".into(),
            session_secret: "s".repeat(64),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            comissao_percentual: 40.0,
            valor_mensalidade_padrao: 100.0,
            admin_seed: None,
        };
        let state = AppState {
            db_pool: pool,
            config: Arc::new(config),
        };
        create_router(state).layer(SessionManagerLayer::new(MemoryStore::default()))
    }

    async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
        let mut req = Request::builder().method(Method::GET).uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        app.clone()
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn location(response: &Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    async fn post(app: &Router, uri: &str, cookie: Option<&str>, body: &str) -> Response {
        let mut req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        app.clone()
            .oneshot(req.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    /// Faz login, confere o painel de destino e devolve o cookie de sessão.
    async fn login(app: &Router, email: &str, password: &str, destino: &str) -> String {
        let body = format!(
            "email={}&password={}",
            urlencoding::encode(email),
            urlencoding::encode(password)
        );
        let response = post(app, "/login", None, &body).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), destino);

        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[sqlx::test]
    async fn paginas_publicas_abrem(pool: SqlitePool) {
        let app = build_test_app(pool);
        for uri in ["/", "/horarios", "/login", "/register"] {
            assert_eq!(get(&app, uri, None).await.status(), StatusCode::OK, "{uri}");
        }
    }

    #[sqlx::test]
    async fn rotas_protegidas_exigem_login(pool: SqlitePool) {
        let app = build_test_app(pool);
        for uri in [
            "/aluno",
            "/admin",
            "/professor",
            "/historico_presenca/1",
            "/relatorio_financeiro_professor",
            "/get_alunos_turma/1",
        ] {
            let response = get(&app, uri, None).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(location(&response), "/login");
        }
    }

    #[sqlx::test]
    async fn aluno_so_acede_ao_proprio_painel(pool: SqlitePool) {
        let form = RegisterForm {
            username: "ana".into(),
            email: Some("ana@gaia.com".into()),
            password: "om-shanti".into(),
            ..Default::default()
        };
        let ana = user_service::register_user(&pool, &form).await.unwrap();
        let outro = user_service::register_user(
            &pool,
            &RegisterForm {
                username: "bia".into(),
                password: "pw".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let app = build_test_app(pool);
        let cookie = login(&app, "ana@gaia.com", "om-shanti", "/aluno").await;

        assert_eq!(get(&app, "/aluno", Some(&cookie)).await.status(), StatusCode::OK);
        assert_eq!(
            get(&app, &format!("/historico_presenca/{ana}"), Some(&cookie)).await.status(),
            StatusCode::OK
        );
        assert_eq!(
            get(&app, &format!("/historico_presenca/{outro}"), Some(&cookie)).await.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(get(&app, "/admin", Some(&cookie)).await.status(), StatusCode::FORBIDDEN);
        assert_eq!(get(&app, "/professor", Some(&cookie)).await.status(), StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    async fn login_invalido_volta_ao_formulario(pool: SqlitePool) {
        let app = build_test_app(pool);
        let response = post(&app, "/login", None, "email=nada%40gaia.com&password=x").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    async fn aluno(pool: &SqlitePool, nome: &str) -> i64 {
        user_service::register_user(
            pool,
            &RegisterForm {
                username: nome.into(),
                password: "pw".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    async fn contar(pool: &SqlitePool, sql: &str) -> i64 {
        sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
    }

    #[sqlx::test]
    async fn chamada_respeita_o_dono_da_turma(pool: SqlitePool) {
        let rosa = user_service::cadastrar_professor(&pool, "Rosa", "rosa@gaia.com", "lotus")
            .await
            .unwrap();
        let lia = user_service::cadastrar_professor(&pool, "Lia", "lia@gaia.com", "lotus")
            .await
            .unwrap();
        let hatha = turma_service::criar_turma(&pool, "Hatha", Some(rosa)).await.unwrap();
        let vinyasa = turma_service::criar_turma(&pool, "Vinyasa", Some(lia)).await.unwrap();
        let ana = aluno(&pool, "ana").await;
        let bia = aluno(&pool, "bia").await;
        for turma in [hatha.id, vinyasa.id] {
            turma_service::matricular_aluno(&pool, turma, ana, None).await.unwrap();
            turma_service::matricular_aluno(&pool, turma, bia, None).await.unwrap();
        }

        let app = build_test_app(pool.clone());
        let cookie = login(&app, "rosa@gaia.com", "lotus", "/professor").await;

        // Turma da Lia: recusada sem gravar nada
        let response = post(
            &app,
            &format!("/salvar_chamada/{}", vinyasa.id),
            Some(&cookie),
            &format!("alunos_presenca={ana}"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/professor?error=Acesso%20negado%21");
        assert_eq!(contar(&pool, "SELECT COUNT(*) FROM presencas").await, 0);

        // Turma própria, checkbox com colchetes
        let response = post(
            &app,
            &format!("/salvar_chamada/{}", hatha.id),
            Some(&cookie),
            &format!("alunos_presenca%5B%5D={ana}"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with("/professor?success="));

        let gravadas: Vec<(i64, bool)> = sqlx::query_as(
            "SELECT user_id, presente FROM presencas WHERE turma_id = ?1 ORDER BY user_id",
        )
        .bind(hatha.id)
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(gravadas, vec![(ana, true), (bia, false)]);
        assert_eq!(contar(&pool, "SELECT COUNT(*) FROM presencas").await, 2);
    }

    #[sqlx::test]
    async fn matricula_sem_aluno_volta_com_erro(pool: SqlitePool) {
        let rosa = user_service::cadastrar_professor(&pool, "Rosa", "rosa@gaia.com", "lotus")
            .await
            .unwrap();
        let hatha = turma_service::criar_turma(&pool, "Hatha", Some(rosa)).await.unwrap();
        let app = build_test_app(pool.clone());
        let cookie = login(&app, "rosa@gaia.com", "lotus", "/professor").await;

        for rota in ["matricular", "remove_aluno"] {
            let response = post(
                &app,
                &format!("/{rota}/{}", hatha.id),
                Some(&cookie),
                "aluno_id=&data_vencimento=",
            )
            .await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{rota}");
            assert_eq!(
                location(&response),
                "/professor?error=Selecione%20um%20aluno%21",
                "{rota}"
            );
        }
        assert_eq!(contar(&pool, "SELECT COUNT(*) FROM matriculas").await, 0);
    }

    #[sqlx::test]
    async fn admin_gera_lote_e_lanca_avulsa(pool: SqlitePool) {
        user_service::seed_admin(&pool, "admin@gaia.com", "segredo").await.unwrap();
        let rosa = user_service::cadastrar_professor(&pool, "Rosa", "rosa@gaia.com", "lotus")
            .await
            .unwrap();
        let hatha = turma_service::criar_turma(&pool, "Hatha", Some(rosa)).await.unwrap();
        let ana = aluno(&pool, "ana").await;
        let bia = aluno(&pool, "bia").await;
        turma_service::matricular_aluno(&pool, hatha.id, ana, None).await.unwrap();
        turma_service::matricular_aluno(&pool, hatha.id, bia, None).await.unwrap();

        let app = build_test_app(pool.clone());
        let cookie = login(&app, "admin@gaia.com", "segredo", "/admin").await;

        let response = post(
            &app,
            "/gerar_mensalidades_lote",
            Some(&cookie),
            &format!("alunos_ids={ana}&alunos_ids={bia}&mes_referencia=2024-09&valor=90%2C50"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with("/admin?success="));
        assert_eq!(
            contar(&pool, "SELECT COUNT(*) FROM mensalidades WHERE mes = '2024-09' AND valor = 90.5").await,
            2
        );

        // Avulsa sem valor usa o padrão; repetir o mesmo mês é recusado
        let avulsa = format!("aluno_id={ana}&turma_id={}&mes_referencia=2024-10&valor=", hatha.id);
        let response = post(&app, "/criar_mensalidade", Some(&cookie), &avulsa).await;
        assert!(location(&response).starts_with("/admin?success="));
        let valor: f64 = sqlx::query_scalar(
            "SELECT valor FROM mensalidades WHERE aluno_id = ?1 AND mes = '2024-10'",
        )
        .bind(ana)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(valor, 100.0);

        let response = post(&app, "/criar_mensalidade", Some(&cookie), &avulsa).await;
        assert!(location(&response).starts_with("/admin?error="));

        let response = post(
            &app,
            "/criar_mensalidade",
            Some(&cookie),
            "aluno_id=&turma_id=&mes_referencia=2024-10",
        )
        .await;
        assert!(location(&response).starts_with("/admin?error="));
        assert_eq!(contar(&pool, "SELECT COUNT(*) FROM mensalidades").await, 3);
    }

    #[sqlx::test]
    async fn horarios_lista_so_turmas_ativas(pool: SqlitePool) {
        let rosa = user_service::cadastrar_professor(&pool, "Rosa", "rosa@gaia.com", "lotus")
            .await
            .unwrap();
        turma_service::criar_turma(&pool, "Hatha", Some(rosa)).await.unwrap();
        let antiga = turma_service::criar_turma(&pool, "Kundalini", Some(rosa)).await.unwrap();
        turma_service::alterar_status_turma(&pool, antiga.id).await.unwrap();

        let app = build_test_app(pool);
        let response = get(&app, "/horarios", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("Hatha"));
        assert!(html.contains("Rosa"));
        assert!(!html.contains("Kundalini"));
    }
}
