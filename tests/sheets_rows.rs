//! Worksheet values through header resolution and record selection.

use notion2post::config::PropertyNames;
use notion2post::sheets::{column_letter, SheetTable};
use notion2post::{select_oldest, AppError, RowRef};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn values(rows: Value) -> Vec<Vec<Value>> {
    serde_json::from_value(rows).unwrap()
}

fn props() -> PropertyNames {
    PropertyNames {
        status: "ステータス".to_string(),
        pending: "未使用".to_string(),
        used: "使用済み".to_string(),
        body: "本文".to_string(),
        media: "画像URL".to_string(),
        last_posted: "最終投稿日時".to_string(),
        times_posted: "投稿回数".to_string(),
        ..PropertyNames::default()
    }
}

#[test]
fn pending_rows_become_records_in_sheet_order() {
    let table = SheetTable::from_values(values(json!([
        ["ID", "本文", "画像URL", "ステータス", "最終投稿日時", "投稿回数"],
        ["q-1", "自己紹介をしてください", "https://drive.google.com/file/d/abc/view", "未使用", "2024-05-01 09:00:00", "2"],
        ["q-2", "退職理由は？", "https://cdn.example.com/b.png", "使用済み", "", ""],
        ["", "逆質問はありますか？", "https://cdn.example.com/c.png", "未使用", "", ""],
        ["q-4", "   ", "https://cdn.example.com/d.png", "未使用", "", ""]
    ])));

    let records = table.records(&props(), Some("ID"), "未使用", true).unwrap();
    let rows: Vec<RowRef> = records.iter().map(|r| r.row.clone()).collect();
    assert_eq!(rows, vec![RowRef::SheetRow(2), RowRef::SheetRow(4)]);
    assert_eq!(records[0].label, "q-1");
    assert_eq!(records[0].times_posted, 2);
    assert!(records[0].last_posted.is_some());
    assert_eq!(records[1].label, "row 4");

    let chosen = select_oldest(records).unwrap();
    assert_eq!(chosen.row, RowRef::SheetRow(4));
}

#[test]
fn sheet_without_status_column_treats_every_row_as_pending() {
    let table = SheetTable::from_values(values(json!([
        ["本文", "画像URL"],
        ["一行目", "https://cdn.example.com/a.jpg"],
        ["二行目"]
    ])));

    let strict = table.records(&props(), None, "未使用", true).unwrap();
    assert_eq!(strict.len(), 1);

    let relaxed = table.records(&props(), None, "未使用", false).unwrap();
    assert_eq!(relaxed.len(), 2);
    assert_eq!(relaxed[1].media_url, None);
}

#[test]
fn missing_body_column_is_a_configuration_error() {
    let table = SheetTable::from_values(values(json!([["Title", "Status"], ["a", "未使用"]])));
    assert!(matches!(
        table.records(&props(), None, "未使用", false),
        Err(AppError::MissingConfiguration(_))
    ));
}

#[test]
fn status_column_letters_cover_wide_sheets() {
    let header: Vec<Value> = (0..28)
        .map(|i| json!(if i == 27 { "ステータス".to_string() } else { format!("c{}", i) }))
        .collect();
    let table = SheetTable::from_values(vec![header]);
    let index = table.column("ステータス").unwrap();
    assert_eq!(column_letter(index), "AB");
}
