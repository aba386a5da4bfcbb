//! `robots.txt` generation.

use crate::config::RobotsConfig;

/// One block per disallow rule. A rule with no paths, or with `*`, blocks
/// the whole site for its agent. With no rules every agent may crawl
/// everything.
pub fn render_robots(config: &RobotsConfig) -> String {
    if config.disallow.is_empty() {
        return "User-agent: *\nDisallow:\n".to_string();
    }

    let blocks: Vec<String> = config
        .disallow
        .iter()
        .map(|rule| {
            let mut block = format!("User-agent: {}\n", rule.agent);
            if rule.paths.is_empty() || rule.paths.iter().any(|p| p == "*") {
                block.push_str("Disallow: /\n");
            } else {
                for path in &rule.paths {
                    block.push_str(&format!("Disallow: {path}\n"));
                }
            }
            block
        })
        .collect();
    blocks.join("\n")
}
