//! Commands for the side panels: `ask`, `craft`, `research`, `characters`
//! and `cost`.

use crate::app::print_notice;
use anyhow::{anyhow, bail, Result};
use quill::panels::{self, AnalyzerOptions};
use quill_client::{
    Backend, CharacterAnalysis, KnowledgeAnswer, KnowledgeSource, Notice, NoticeContext,
    ResearchAnswer, SessionCost, SkillInfo,
};
use std::fmt::Write;

pub async fn ask(backend: &dyn Backend, question: &str, source: &str) -> Result<()> {
    let source: KnowledgeSource = source.parse().map_err(|e: String| anyhow!(e))?;
    let run = panels::ask_knowledge(backend, question, source).await?;
    print_notice(&run.notice);
    if let Some(answer) = &run.output {
        print!("{}", knowledge(answer));
    }
    Ok(())
}

pub async fn craft(
    backend: &dyn Backend,
    project_id: &str,
    skill: Option<&str>,
    scene: Option<&str>,
) -> Result<()> {
    let Some(skill) = skill else {
        let run = panels::list_skills(backend).await;
        match &run.output {
            Some(listed) => print!("{}", skills(listed)),
            None => print_notice(&run.notice),
        }
        return Ok(());
    };
    let Some(scene) = scene else {
        bail!("Give the scene to run {skill} on with --scene");
    };
    let content = match backend.scene(&scene.into()).await {
        Ok(scene) => scene.content,
        Err(error) => {
            print_notice(&Notice::from_error(&error, NoticeContext::Scene));
            return Ok(());
        },
    };

    let execution =
        panels::skill_execution(skill, &content, project_id, &AnalyzerOptions::default())?;
    let run = panels::execute_skill(backend, &execution).await;
    print_notice(&run.notice);
    if let Some(result) = &run.output {
        println!("{}", serde_json::to_string_pretty(&result.data)?);
    }
    Ok(())
}

/// Notebook to link with `quill research --add`.
pub struct NotebookLink<'a> {
    pub url: &'a str,
    pub name: &'a str,
    pub tags: &'a str,
}

pub async fn add_notebook(
    backend: &dyn Backend,
    project_id: &str,
    link: NotebookLink<'_>,
) -> Result<()> {
    let notebook = panels::new_notebook(project_id, link.name, link.url, "", link.tags)?;
    let notice = panels::add_notebook(backend, &notebook).await;
    print_notice(&notice);
    if notice.is_error() {
        bail!("Notebook {} was not added", link.url);
    }
    Ok(())
}

pub async fn research(
    backend: &dyn Backend,
    project_id: &str,
    question: Option<&str>,
    notebook: Option<&str>,
) -> Result<()> {
    let listed = panels::notebooks(backend, project_id).await;
    let Some(notebooks) = listed.output else {
        print_notice(&listed.notice);
        return Ok(());
    };
    let Some(question) = question else {
        for listed in &notebooks {
            println!("  {} [{}] {}", listed.name, listed.id, listed.url);
        }
        print_notice(&listed.notice);
        return Ok(());
    };

    let run =
        panels::ask_research(backend, project_id, question, notebook, notebooks.len()).await?;
    print_notice(&run.notice);
    if let Some(answer) = &run.output {
        print!("{}", research_answer(answer));
    }
    Ok(())
}

pub async fn characters(backend: &dyn Backend, project_id: &str, id: Option<&str>) -> Result<()> {
    let Some(id) = id else {
        let run = panels::characters(backend, project_id).await;
        for character in run.output.iter().flatten() {
            let role = character.role.as_deref().unwrap_or("unknown role");
            println!("  {} [{}] {role}", character.name, character.id);
        }
        print_notice(&run.notice);
        return Ok(());
    };

    let run = panels::analyze_character(backend, id).await;
    print_notice(&run.notice);
    if let Some(analysis) = &run.output {
        print!("{}", character(analysis));
    }
    Ok(())
}

pub async fn cost(backend: &dyn Backend) -> Result<()> {
    let run = panels::session_cost(backend).await;
    print_notice(&run.notice);
    if let Some(cost) = &run.output {
        print!("{}", breakdown(cost));
    }
    Ok(())
}

fn knowledge(answer: &KnowledgeAnswer) -> String {
    let mut out = format!("{}\n", answer.answer);
    if !answer.references.is_empty() {
        out.push_str("References:\n");
        for reference in &answer.references {
            let _ = writeln!(out, "  {reference}");
        }
    }
    out
}

fn skills(skills: &[SkillInfo]) -> String {
    let mut out = String::new();
    for skill in skills {
        let state = if skill.available {
            "Available"
        } else {
            "Unavailable"
        };
        let _ = writeln!(out, "  {} {} ({state})", skill.skill_id, skill.name);
    }
    out
}

fn research_answer(answer: &ResearchAnswer) -> String {
    let mut out = String::new();
    if let Some(name) = &answer.notebook_name {
        let _ = writeln!(out, "From: {name}");
    }
    let _ = writeln!(out, "{}", answer.answer);
    for (i, source) in answer.sources.iter().enumerate() {
        let _ = write!(out, "  {}. {}", i + 1, source.title);
        if let Some(page) = &source.page {
            let page = page.as_str().map_or_else(|| page.to_string(), str::to_owned);
            let _ = write!(out, " (p. {page})");
        }
        out.push('\n');
    }
    out
}

fn character(analysis: &CharacterAnalysis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Depth: {}/100", analysis.depth_score);
    for flag in &analysis.flags {
        let _ = writeln!(out, "  [{}] {}", flag.severity, flag.message);
        if let Some(recommendation) = &flag.recommendation {
            let _ = writeln!(out, "    -> {recommendation}");
        }
    }
    for recommendation in &analysis.recommendations {
        let _ = writeln!(out, "  + {}", recommendation.message);
    }
    out
}

fn breakdown(cost: &SessionCost) -> String {
    if cost.by_model.is_empty() {
        return "No generations yet.\n".to_string();
    }
    let mut out = format!(
        "{} local / {} cloud\n",
        cost.local_generations, cost.cloud_generations
    );
    for model in &cost.by_model {
        let tag = if model.is_local { " FREE" } else { "" };
        let noun = if model.count == 1 {
            "generation"
        } else {
            "generations"
        };
        let _ = writeln!(
            out,
            "  {}{tag} ${:.4} ({} {noun})",
            model.model, model.cost, model.count
        );
    }
    out
}
