use grev::git_revision_auto;

fn main() {
    let revision = match git_revision_auto(".") {
        Ok(Some(revision)) => revision,
        Ok(None) | Err(_) => "unknown".to_string(),
    };
    println!("cargo:rustc-env=CATTRACE_GIT_REVISION={revision}");
}
