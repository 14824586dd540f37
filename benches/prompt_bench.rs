//! Benchmarks for request validation and prompt rendering.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use recipe_relay::recipe::prompt::{render_pantry_list, OutputFormat, RecipeProfile};
use recipe_relay::recipe::{PantryItem, RecipeRequest};

fn pantry(n: usize) -> Vec<PantryItem> {
    (0..n)
        .map(|i| {
            let item = PantryItem::new(format!("Ingredient {i}"));
            match i % 3 {
                0 => item.with_quantity(format!("{i} g")).with_expiration_date("2026-11-01"),
                1 => item.with_quantity("1 can"),
                _ => item,
            }
        })
        .collect()
}

fn bench_render_pantry_list(c: &mut Criterion) {
    let items = pantry(200);

    c.bench_function("render_pantry_list_200", |b| {
        b.iter(|| render_pantry_list(black_box(&items)))
    });
}

fn bench_build_prompt(c: &mut Criterion) {
    let request = RecipeRequest::new(pantry(50)).unwrap();
    let json = RecipeProfile::new(OutputFormat::Json);
    let markdown = RecipeProfile::new(OutputFormat::Markdown);

    c.bench_function("build_prompt_json_50", |b| {
        b.iter(|| json.build_prompt(black_box(&request)))
    });

    c.bench_function("build_prompt_markdown_50", |b| {
        b.iter(|| markdown.build_prompt(black_box(&request)))
    });
}

fn bench_parse_body(c: &mut Criterion) {
    let body = serde_json::json!({
        "items": (0..50)
            .map(|i| serde_json::json!({ "name": format!("Item {i}"), "quantity": i }))
            .collect::<Vec<_>>()
    })
    .to_string();

    c.bench_function("parse_body_50", |b| {
        b.iter(|| RecipeRequest::from_body(black_box(body.as_bytes())).unwrap())
    });
}

criterion_group!(
    benches,
    bench_render_pantry_list,
    bench_build_prompt,
    bench_parse_body
);
criterion_main!(benches);
