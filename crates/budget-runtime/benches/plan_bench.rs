use budget_core::{Allocation, Department, Phase, PhaseKind, Project, Role, Stage};
use criterion::{criterion_group, criterion_main, Criterion};

const ROLE_NAMES: [&str; 5] = ["Conceptor", "Designer", "Copywriter", "Producer", "Strategist"];
const DEPARTMENTS: [&str; 5] = ["Creative", "Design", "Copy", "Production", "Strategy"];

fn large_project() -> Project {
    let mut project = Project {
        id: "bench".into(),
        start_date: chrono::NaiveDate::from_ymd_opt(2025, 1, 6),
        end_date: chrono::NaiveDate::from_ymd_opt(2025, 12, 19),
        rate_card: "Standard".into(),
        phases: PhaseKind::ALL.to_vec(),
        ..Project::default()
    };
    for kind in PhaseKind::ALL {
        let stages = (0..4)
            .map(|s| Stage {
                id: format!("{kind}-{s}"),
                name: format!("Stage {s}"),
                duration: 6,
                departments: DEPARTMENTS
                    .iter()
                    .enumerate()
                    .map(|(d, name)| {
                        let mut dept = Department::new(*name);
                        dept.roles = (0..5)
                            .map(|r| {
                                Role::new(
                                    format!("{s}-{d}-{r}"),
                                    ROLE_NAMES[(d + r) % ROLE_NAMES.len()],
                                    1 + (r as u32 % 6),
                                    Allocation::ALL[r % Allocation::ALL.len()],
                                )
                            })
                            .collect();
                        dept
                    })
                    .collect(),
            })
            .collect();
        project.phase_data.insert(
            kind,
            Phase {
                stages,
                ..Phase::default()
            },
        );
    }
    project
}

fn bench_plan(c: &mut Criterion) {
    let rates = budget_econ::RateTable::builtin().unwrap();
    let project = budget_econ::apply_rate_card(&large_project(), &rates, "Standard");

    c.bench_function("project_totals", |b| {
        b.iter(|| budget_econ::project_totals(&project))
    });
    c.bench_function("apply_rate_card", |b| {
        b.iter(|| budget_econ::apply_rate_card(&project, &rates, "Premium"))
    });
    c.bench_function("derive_resource_assignments", |b| {
        b.iter(|| resourcing::derive_resource_assignments(&project, None))
    });
}

criterion_group!(benches, bench_plan);
criterion_main!(benches);
