use ecoleta_api::{
    create_point, create_session, index_points, list_items, show_point, update_point, ApiContext,
    PointForm, PointUpdateForm, PointsQuery, SessionForm, UploadedFile,
};
use ecoleta_core::{ServiceConfig, MIN_BCRYPT_COST};
use serde_json::Value;
use tempfile::TempDir;

struct Harness {
    dir: TempDir,
    ctx: ApiContext,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServiceConfig::new(
            dir.path().join("ecoleta.db"),
            dir.path().join("uploads"),
            "http://localhost:3333/uploads",
            "api-test-secret-0123456789",
        );
        config.bcrypt_cost = MIN_BCRYPT_COST;
        config.item_image_base_url = Some("http://localhost:3333/items".to_string());
        let ctx = ApiContext::from_config(config).unwrap();
        Self { dir, ctx }
    }

    fn upload_count(&self) -> usize {
        std::fs::read_dir(self.dir.path().join("uploads"))
            .unwrap()
            .count()
    }
}

fn form(email: &str, items: &str) -> PointForm {
    PointForm {
        name: Some("Ecoponto Centro".to_string()),
        email: Some(email.to_string()),
        password: Some("s3cret-pass".to_string()),
        whatsapp: Some("5511999990000".to_string()),
        latitude: Some("-23.55".to_string()),
        longitude: Some("-46.63".to_string()),
        city: Some("Sao Paulo".to_string()),
        uf: Some("SP".to_string()),
        items: Some(items.to_string()),
    }
}

fn upload(name: &str) -> Option<UploadedFile> {
    Some(UploadedFile {
        original_name: name.to_string(),
        bytes: b"png-bytes".to_vec(),
    })
}

fn query(items: &str) -> PointsQuery {
    PointsQuery {
        city: Some("Sao Paulo".to_string()),
        uf: Some("SP".to_string()),
        items: Some(items.to_string()),
        ..PointsQuery::default()
    }
}

fn point_id(body: &Value) -> i64 {
    body["point"]["id"].as_i64().unwrap()
}

#[test]
fn create_then_list_and_show() {
    let harness = Harness::new();

    let created = create_point(&harness.ctx, &form("a@x.com", "1,2"), upload("photo.png"));
    assert_eq!(created.status, 200, "{}", created.body);
    assert!(created.body["token"].as_str().unwrap().split('.').count() == 3);
    let id = point_id(&created.body);
    assert!(created.body["point"]["image_url"]
        .as_str()
        .unwrap()
        .starts_with("http://localhost:3333/uploads/"));

    let matching = index_points(&harness.ctx, &query("1"));
    assert_eq!(matching.status, 200);
    assert_eq!(matching.body.as_array().unwrap().len(), 1);
    assert_eq!(matching.body[0]["id"], id);

    let unrelated = index_points(&harness.ctx, &query("9"));
    assert_eq!(unrelated.status, 200);
    assert!(unrelated.body.as_array().unwrap().is_empty());

    let shown = show_point(&harness.ctx, &id.to_string());
    assert_eq!(shown.status, 200);
    assert_eq!(shown.body["point"]["name"], "Ecoponto Centro");
    assert_eq!(shown.body["point"]["latitude"], -23.55);
    assert_eq!(shown.body["items"].as_array().unwrap().len(), 2);
}

#[test]
fn responses_never_carry_credentials() {
    let harness = Harness::new();
    let created = create_point(&harness.ctx, &form("a@x.com", "1"), upload("photo.png"));
    let updated = update_point(
        &harness.ctx,
        &PointUpdateForm {
            originalemail: Some("a@x.com".to_string()),
            fields: PointForm {
                password: Some("n3w-pass".to_string()),
                ..PointForm::default()
            },
        },
        None,
    );
    let duplicate = create_point(&harness.ctx, &form("a@x.com", "1"), upload("other.png"));

    for response in [&created, &updated, &duplicate] {
        let text = response.body.to_string();
        assert!(!text.contains("password"), "{text}");
        assert!(!text.contains("s3cret-pass"), "{text}");
        assert!(!text.contains("n3w-pass"), "{text}");
        assert!(!text.contains("$2"), "{text}");
    }
}

#[test]
fn duplicate_email_returns_structured_error_and_discards_upload() {
    let harness = Harness::new();
    assert_eq!(
        create_point(&harness.ctx, &form("a@x.com", "1"), upload("a.png")).status,
        200
    );
    assert_eq!(harness.upload_count(), 1);

    let duplicate = create_point(&harness.ctx, &form("A@x.com", "2"), upload("b.png"));
    assert_eq!(duplicate.status, 400);
    assert_eq!(duplicate.body["error"], true);
    assert_eq!(duplicate.body["information"]["in"], "email");
    assert_eq!(
        duplicate.body["information"]["code"],
        "EMAIL_ALREADY_REGISTERED"
    );
    assert_eq!(harness.upload_count(), 1);
}

#[test]
fn create_without_image_or_with_bad_fields_is_rejected() {
    let harness = Harness::new();

    let no_image = create_point(&harness.ctx, &form("a@x.com", "1"), None);
    assert_eq!(no_image.status, 400);
    assert_eq!(no_image.body["information"]["code"], "IMAGE_REQUIRED");

    let mut bad_latitude = form("a@x.com", "1");
    bad_latitude.latitude = Some("north".to_string());
    let response = create_point(&harness.ctx, &bad_latitude, upload("a.png"));
    assert_eq!(response.status, 400);
    assert_eq!(response.body["information"]["in"], "latitude");

    let bad_items = create_point(&harness.ctx, &form("a@x.com", "1,abc"), upload("a.png"));
    assert_eq!(bad_items.status, 400);
    assert_eq!(bad_items.body["information"]["in"], "items");

    assert_eq!(harness.upload_count(), 0);
}

#[test]
fn show_reports_missing_point_with_message_body() {
    let harness = Harness::new();

    let missing = show_point(&harness.ctx, "404");
    assert_eq!(missing.status, 400);
    assert_eq!(missing.body, serde_json::json!({"message": "point not found."}));

    let malformed = show_point(&harness.ctx, "abc");
    assert_eq!(malformed.status, 400);
    assert_eq!(malformed.body["information"]["in"], "id");
}

#[test]
fn update_replaces_items_and_reports_unknown_original_email() {
    let harness = Harness::new();
    let created = create_point(&harness.ctx, &form("a@x.com", "1,2,3"), upload("a.png"));
    let id = point_id(&created.body);

    let updated = update_point(
        &harness.ctx,
        &PointUpdateForm {
            originalemail: Some("a@x.com".to_string()),
            fields: PointForm {
                items: Some("4".to_string()),
                ..PointForm::default()
            },
        },
        None,
    );
    assert_eq!(updated.status, 200, "{}", updated.body);
    assert_eq!(updated.body["items"].as_array().unwrap().len(), 1);
    assert_eq!(updated.body["items"][0]["id"], 4);

    let untouched = update_point(
        &harness.ctx,
        &PointUpdateForm {
            originalemail: Some("a@x.com".to_string()),
            fields: PointForm {
                name: Some("Renamed".to_string()),
                items: Some(String::new()),
                ..PointForm::default()
            },
        },
        None,
    );
    assert_eq!(untouched.status, 200);
    assert_eq!(untouched.body["items"][0]["id"], 4);

    let missing = update_point(
        &harness.ctx,
        &PointUpdateForm {
            originalemail: Some("ghost@x.com".to_string()),
            fields: PointForm {
                name: Some("Ghost".to_string()),
                ..PointForm::default()
            },
        },
        upload("ghost.png"),
    );
    assert_eq!(missing.status, 400);
    assert_eq!(
        missing.body,
        serde_json::json!({"message": "raw point not found."})
    );
    assert_eq!(harness.upload_count(), 1);

    let shown = show_point(&harness.ctx, &id.to_string());
    assert_eq!(shown.body["point"]["name"], "Renamed");
}

#[test]
fn update_without_original_email_reports_raw_point_not_found() {
    let harness = Harness::new();
    create_point(&harness.ctx, &form("a@x.com", "1"), upload("a.png"));

    for originalemail in [None, Some("   ".to_string())] {
        let response = update_point(
            &harness.ctx,
            &PointUpdateForm {
                originalemail,
                fields: PointForm {
                    name: Some("Renamed".to_string()),
                    ..PointForm::default()
                },
            },
            upload("b.png"),
        );
        assert_eq!(response.status, 400);
        assert_eq!(
            response.body,
            serde_json::json!({"message": "raw point not found."})
        );
    }
    assert_eq!(harness.upload_count(), 1);
}

#[test]
fn update_with_new_image_replaces_the_stored_file() {
    let harness = Harness::new();
    create_point(&harness.ctx, &form("a@x.com", "1"), upload("a.png"));

    let updated = update_point(
        &harness.ctx,
        &PointUpdateForm {
            originalemail: Some("a@x.com".to_string()),
            fields: PointForm::default(),
        },
        upload("b.png"),
    );
    assert_eq!(updated.status, 200, "{}", updated.body);
    assert!(updated.body["point"]["image"]
        .as_str()
        .unwrap()
        .ends_with("-b.png"));
    assert_eq!(harness.upload_count(), 1);
}

#[test]
fn list_flags_and_validation() {
    let harness = Harness::new();
    create_point(&harness.ctx, &form("a@x.com", "2,5"), upload("a.png"));

    let missing_items = index_points(&harness.ctx, &query(""));
    assert_eq!(missing_items.status, 400);
    assert_eq!(missing_items.body["information"]["in"], "items");

    let all = index_points(
        &harness.ctx,
        &PointsQuery {
            ignore_items: Some("yes".to_string()),
            return_items: Some("1".to_string()),
            ..query("")
        },
    );
    assert_eq!(all.status, 200);
    assert_eq!(all.body[0]["items"].as_array().unwrap().len(), 2);
}

#[test]
fn sessions_issue_tokens_for_valid_credentials_only() {
    let harness = Harness::new();
    create_point(&harness.ctx, &form("a@x.com", "1"), upload("a.png"));

    let ok = create_session(
        &harness.ctx,
        &SessionForm {
            email: Some("a@x.com".to_string()),
            password: Some("s3cret-pass".to_string()),
        },
    );
    assert_eq!(ok.status, 200);
    assert!(ok.body["token"].is_string());

    let rejected = create_session(
        &harness.ctx,
        &SessionForm {
            email: Some("a@x.com".to_string()),
            password: Some("wrong".to_string()),
        },
    );
    assert_eq!(rejected.status, 401);
    assert_eq!(rejected.body["information"]["code"], "INVALID_CREDENTIALS");
}

#[test]
fn items_catalog_is_listed_with_urls() {
    let harness = Harness::new();

    let response = list_items(&harness.ctx);
    assert_eq!(response.status, 200);
    let items = response.body.as_array().unwrap();
    assert_eq!(items.len(), 6);
    assert_eq!(items[0]["image_url"], "http://localhost:3333/items/lampadas.svg");
}
