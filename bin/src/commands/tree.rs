use crate::app::print_notice;
use anyhow::Result;
use quill::TreeCache;
use quill_client::{Backend, ManuscriptTree, Notice, NoticeContext};
use std::fmt::Write;

pub async fn run(backend: &dyn Backend) -> Result<()> {
    let mut cache = TreeCache::new();
    match cache.get(backend).await {
        Ok(tree) => print!("{}", render(tree)),
        Err(error) => print_notice(&Notice::from_error(&error, NoticeContext::General)),
    }
    Ok(())
}

pub fn render(tree: &ManuscriptTree) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({} words)", tree.title, tree.word_count());
    for act in &tree.acts {
        let _ = writeln!(out, "  {}", act.title);
        for chapter in &act.chapters {
            let _ = writeln!(out, "    {}", chapter.title);
            for scene in &chapter.scenes {
                let _ = writeln!(
                    out,
                    "      {} [{}] {} words",
                    scene.title, scene.id, scene.word_count
                );
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_client::mock::MockBackend;

    #[tokio::test]
    async fn renders_nested_tree() {
        let backend = MockBackend::new()
            .with_scene("s-1", "Dock", "one two")
            .with_scene("s-2", "Harbor", "three");
        let tree = backend.manuscript_tree().await.unwrap();

        assert_eq!(
            render(&tree),
            "Manuscript (3 words)\n  Act One\n    Chapter One\n\
             \x20     Dock [s-1] 2 words\n      Harbor [s-2] 1 words\n"
        );
    }
}
