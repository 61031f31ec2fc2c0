//! Part 1: the project must compile and its tests must pass.

use async_trait::async_trait;
use runner::maven::SPRING_BOOT_PLUGIN;

use crate::context::GradingContext;
use crate::error::GraderError;
use crate::parts::PartGrader;
use crate::report::GradePart;

const MAX_GRADE: f64 = 4.0;

pub struct CompilationPart;

#[async_trait]
impl PartGrader for CompilationPart {
    fn name(&self) -> String {
        "Part 1 - Compilation & Tests".to_string()
    }

    fn max_grade(&self) -> Option<f64> {
        Some(MAX_GRADE)
    }

    async fn grade(&self, context: &mut GradingContext) -> Result<GradePart, GraderError> {
        if !context.repo.path.join("pom.xml").exists() {
            context.mark_compilation_failed();
            return Ok(self.result(vec!["Not a Maven project".to_string()], 0.0));
        }

        let build = context.collaborators.build.clone();
        let compile = build
            .execute_goals(&context.repo.path, &["clean", "test-compile"])
            .await;
        if !compile.is_ok() {
            context.mark_compilation_failed();
            return Ok(self.result(
                vec!["Compilation failed, see `mvn test-compile`".to_string()],
                0.0,
            ));
        }

        // Warm up the run plugin and install the module tree so later stages
        // can launch a single module on its own.
        let plugin_help = format!("{SPRING_BOOT_PLUGIN}:help");
        build
            .execute_goals(&context.repo.path, &[plugin_help.as_str()])
            .await;
        build.execute_goals(&context.repo.path, &["install"]).await;

        let verify = build.execute_goals(&context.repo.path, &["verify"]).await;
        if !verify.is_ok() {
            context.mark_test_failed();
            Ok(self.result(
                vec!["There are test failures, see `mvn verify`".to_string()],
                MAX_GRADE / 2.0,
            ))
        } else {
            Ok(self.result(vec![], MAX_GRADE))
        }
    }
}
