// tests/attempt_tests.rs
//
// End-to-end coverage of the attempt lifecycle: eligibility on GET and
// POST, scoring, the persisted answer trail, and the reattempt race.

use std::collections::HashMap;

use quizdesk::{config::Config, routes, state::AppState, utils::hash::hash_password};
use sqlx::postgres::{PgPool, PgPoolOptions};

async fn test_pool() -> PgPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.")
}

async fn spawn_app() -> (String, PgPool) {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = test_pool().await;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url,
        jwt_secret: "attempt_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

/// Registers a fresh user through the API and returns (user token).
async fn login_new_user(client: &reqwest::Client, address: &str) -> String {
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Register failed");

    let login: serde_json::Value = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    login["token"].as_str().expect("Token not found").to_string()
}

/// Seeds an admin user directly (registration always yields role 'user')
/// and logs in through the API.
async fn login_new_admin(client: &reqwest::Client, address: &str, pool: &PgPool) -> String {
    let username = format!("a_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";
    let hashed = hash_password(password).expect("hash failed");

    sqlx::query("INSERT INTO users (username, password, role) VALUES ($1, $2, 'admin')")
        .bind(&username)
        .bind(&hashed)
        .execute(pool)
        .await
        .expect("Failed to seed admin");

    let login: serde_json::Value = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    login["token"].as_str().expect("Token not found").to_string()
}

/// Creates a quiz with three questions (options A-D, correct answers
/// B, A, D) and returns (quiz_id, question ids in creation order).
async fn seed_quiz(client: &reqwest::Client, address: &str, admin_token: &str) -> (i64, Vec<i64>) {
    let created: serde_json::Value = client
        .post(&format!("{}/api/admin/quizzes", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({ "title": "Capitals", "duration_secs": 300 }))
        .send()
        .await
        .expect("Create quiz failed")
        .json()
        .await
        .expect("Failed to parse create-quiz json");

    let quiz_id = created["id"].as_i64().expect("quiz id missing");

    let correct_letters = ["B", "A", "D"];
    let mut question_ids = Vec::new();

    for (i, correct) in correct_letters.iter().enumerate() {
        let options: Vec<serde_json::Value> = ["A", "B", "C", "D"]
            .iter()
            .map(|letter| {
                serde_json::json!({ "text": letter, "is_correct": letter == correct })
            })
            .collect();

        let question: serde_json::Value = client
            .post(&format!("{}/api/admin/quizzes/{}/questions", address, quiz_id))
            .header("Authorization", format!("Bearer {}", admin_token))
            .json(&serde_json::json!({
                "text": format!("Question {}", i + 1),
                "options": options
            }))
            .send()
            .await
            .expect("Add question failed")
            .json()
            .await
            .expect("Failed to parse add-question json");

        question_ids.push(question["id"].as_i64().expect("question id missing"));
    }

    (quiz_id, question_ids)
}

/// Picks the option id carrying `letter` out of a take-view question.
fn option_id_for(take_view: &serde_json::Value, question_id: i64, letter: &str) -> i64 {
    take_view["questions"]
        .as_array()
        .expect("questions missing")
        .iter()
        .find(|q| q["id"].as_i64() == Some(question_id))
        .expect("question not in take view")["options"]
        .as_array()
        .expect("options missing")
        .iter()
        .find(|o| o["text"].as_str() == Some(letter))
        .expect("option not in take view")["id"]
        .as_i64()
        .expect("option id missing")
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn take_missing_quiz_is_404() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login_new_user(&client, &address).await;

    let response = client
        .get(&format!("{}/api/quiz/999999999", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn full_attempt_flow_scores_and_records_trail() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = login_new_admin(&client, &address, &pool).await;
    let user_token = login_new_user(&client, &address).await;

    let (quiz_id, question_ids) = seed_quiz(&client, &address, &admin_token).await;

    // Take view must not leak correctness flags.
    let take_view: serde_json::Value = client
        .get(&format!("{}/api/quiz/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .expect("Take failed")
        .json()
        .await
        .expect("Failed to parse take json");

    assert_eq!(take_view["quiz"]["duration_secs"].as_i64(), Some(300));
    let first_option = &take_view["questions"][0]["options"][0];
    assert!(first_option.get("is_correct").is_none());

    // Q1 correct (B), Q2 wrong (C), Q3 unanswered.
    let mut form = HashMap::new();
    form.insert(
        format!("q-{}", question_ids[0]),
        option_id_for(&take_view, question_ids[0], "B").to_string(),
    );
    form.insert(
        format!("q-{}", question_ids[1]),
        option_id_for(&take_view, question_ids[1], "C").to_string(),
    );

    let submit: serde_json::Value = client
        .post(&format!("{}/api/quiz/{}/submit", address, quiz_id))
        .header("Authorization", format!("Bearer {}", user_token))
        .form(&form)
        .send()
        .await
        .expect("Submit failed")
        .json()
        .await
        .expect("Failed to parse submit json");

    assert_eq!(submit["score"].as_i64(), Some(1));
    assert_eq!(submit["total_questions"].as_i64(), Some(3));
    let result_id = submit["result_id"].as_i64().expect("result id missing");

    // Answer trail: one entry per question, unanswered entry has a null
    // selected_option_id.
    let details: serde_json::Value = client
        .get(&format!("{}/api/admin/results/{}", address, result_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .expect("Result details failed")
        .json()
        .await
        .expect("Failed to parse details json");

    let answers = details["answers"].as_array().expect("answers missing");
    assert_eq!(answers.len(), 3);

    let by_question: HashMap<i64, &serde_json::Value> = answers
        .iter()
        .map(|a| (a["question_id"].as_i64().unwrap(), a))
        .collect();

    assert_eq!(by_question[&question_ids[0]]["is_correct"].as_bool(), Some(true));
    assert_eq!(by_question[&question_ids[1]]["is_correct"].as_bool(), Some(false));
    assert_eq!(by_question[&question_ids[2]]["is_correct"].as_bool(), Some(false));
    assert!(by_question[&question_ids[2]]["selected_option_id"].is_null());
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn reattempt_is_rejected_on_get_and_post() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = login_new_admin(&client, &address, &pool).await;
    let user_token = login_new_user(&client, &address).await;

    let (quiz_id, question_ids) = seed_quiz(&client, &address, &admin_token).await;

    // First attempt: submit empty form, scores 0 but records an attempt.
    let empty: HashMap<String, String> = HashMap::new();
    let first = client
        .post(&format!("{}/api/quiz/{}/submit", address, quiz_id))
        .header("Authorization", format!("Bearer {}", user_token))
        .form(&empty)
        .send()
        .await
        .expect("Submit failed");
    assert_eq!(first.status().as_u16(), 200);

    // Both the take view and a second submit are now rejected.
    let take = client
        .get(&format!("{}/api/quiz/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .expect("Take failed");
    assert_eq!(take.status().as_u16(), 409);

    let mut form = HashMap::new();
    form.insert(format!("q-{}", question_ids[0]), "1".to_string());
    let second = client
        .post(&format!("{}/api/quiz/{}/submit", address, quiz_id))
        .header("Authorization", format!("Bearer {}", user_token))
        .form(&form)
        .send()
        .await
        .expect("Submit failed");
    assert_eq!(second.status().as_u16(), 409);

    // Exactly one result and one answer trail were written.
    let result_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM results WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(result_count, 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn reattempts_allowed_creates_independent_results() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = login_new_admin(&client, &address, &pool).await;
    let user_token = login_new_user(&client, &address).await;

    let (quiz_id, _question_ids) = seed_quiz(&client, &address, &admin_token).await;

    let update = client
        .put(&format!("{}/api/admin/quizzes/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({ "allow_reattempts": true }))
        .send()
        .await
        .expect("Update failed");
    assert_eq!(update.status().as_u16(), 200);

    let empty: HashMap<String, String> = HashMap::new();
    for _ in 0..2 {
        let response = client
            .post(&format!("{}/api/quiz/{}/submit", address, quiz_id))
            .header("Authorization", format!("Bearer {}", user_token))
            .form(&empty)
            .send()
            .await
            .expect("Submit failed");
        assert_eq!(response.status().as_u16(), 200);
    }

    let result_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM results WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(result_count, 2);

    // Each result carries its own full answer trail.
    let trail_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_answers a JOIN results r ON r.id = a.result_id WHERE r.quiz_id = $1",
    )
    .bind(quiz_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(trail_count, 6);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn concurrent_submissions_persist_at_most_one_result() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = login_new_admin(&client, &address, &pool).await;
    let user_token = login_new_user(&client, &address).await;

    let (quiz_id, _question_ids) = seed_quiz(&client, &address, &admin_token).await;

    let empty: HashMap<String, String> = HashMap::new();
    let submit = |token: String| {
        let client = client.clone();
        let address = address.clone();
        let empty = empty.clone();
        async move {
            client
                .post(&format!("{}/api/quiz/{}/submit", address, quiz_id))
                .header("Authorization", format!("Bearer {}", token))
                .form(&empty)
                .send()
                .await
                .expect("Submit failed")
                .status()
                .as_u16()
        }
    };

    let (first, second) = tokio::join!(submit(user_token.clone()), submit(user_token.clone()));

    let mut statuses = [first, second];
    statuses.sort();
    assert_eq!(statuses, [200, 409]);

    let result_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM results WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(result_count, 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn own_results_hide_score_when_disabled() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = login_new_admin(&client, &address, &pool).await;
    let user_token = login_new_user(&client, &address).await;

    let (quiz_id, _question_ids) = seed_quiz(&client, &address, &admin_token).await;

    client
        .put(&format!("{}/api/admin/quizzes/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({ "show_score": false }))
        .send()
        .await
        .expect("Update failed");

    let empty: HashMap<String, String> = HashMap::new();
    client
        .post(&format!("{}/api/quiz/{}/submit", address, quiz_id))
        .header("Authorization", format!("Bearer {}", user_token))
        .form(&empty)
        .send()
        .await
        .expect("Submit failed");

    let results: serde_json::Value = client
        .get(&format!("{}/api/results", address))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .expect("Results failed")
        .json()
        .await
        .expect("Failed to parse results json");

    let own = results.as_array().expect("results array missing");
    assert_eq!(own.len(), 1);
    assert!(own[0]["score"].is_null());
    assert_eq!(own[0]["total_questions"].as_i64(), Some(3));
}
