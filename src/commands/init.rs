//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

const CONFIG: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
description: ''
author: ''
language: pt-BR
timezone: America/Sao_Paulo

# URL
url: http://localhost:4000
root: /

# Directory
source_dir: source
public_dir: public

# Date / Time format (date-fns patterns)
date_format: d MMM yyyy
edited_format: "d MMM yyyy, 'às' HH:mm"

# Listing
per_page: 5

# Content source
## Set `endpoint` (or PRISMIC_ENDPOINT) and remove `fixtures` to read
## from a Prismic repository. PRISMIC_ACCESS_TOKEN overrides access_token.
## POST /api/revalidate requires webhook_secret (or PRISMIC_WEBHOOK_SECRET)
## as a `secret` query parameter or in the webhook JSON body when set.
prismic:
  endpoint: ''
  access_token: ''
  webhook_secret: ''
  document_type: posts
  fixtures: fixtures/posts.json

# Comments (utterances)
comments:
  enable: false
  repo: ''
  issue_term: pathname
  label: "comentário :speech_balloon:"
  theme: github-dark
"#;

const LANGUAGE_OVERRIDE: &str = r#"# Override any built-in UI string, e.g.
# load_more: Carregar mais posts
"#;

const FIXTURES: &str = r#"{
  "results": [
    {
      "id": "YFVmtBIAACQAvx5p",
      "uid": "como-utilizar-hooks",
      "type": "posts",
      "first_publication_date": "2021-03-25T19:25:28+0000",
      "last_publication_date": "2021-03-25T19:25:28+0000",
      "data": {
        "title": "Como utilizar Hooks",
        "subtitle": "Pensando em sincronização em vez de ciclos de vida",
        "author": "Joseph Oliveira",
        "banner": { "url": "" },
        "content": [
          {
            "heading": "Proin et varius",
            "body": [
              {
                "type": "paragraph",
                "text": "Nullam dolor sapien, vulputate eu diam at, condimentum hendrerit tellus.",
                "spans": [{ "start": 0, "end": 6, "type": "strong" }]
              }
            ]
          }
        ]
      }
    },
    {
      "id": "YFVmtBIAACQAvx5q",
      "uid": "criando-um-app-cra-do-zero",
      "type": "posts",
      "first_publication_date": "2021-03-15T19:25:28+0000",
      "last_publication_date": "2021-03-15T19:25:28+0000",
      "data": {
        "title": "Criando um app CRA do zero",
        "subtitle": "Tudo sobre como criar a sua primeira aplicação utilizando Create React App",
        "author": "Danilo Vieira",
        "banner": { "url": "" },
        "content": [
          {
            "heading": "Cras laoreet mi",
            "body": [
              {
                "type": "paragraph",
                "text": "Ut varius quis velit sed cursus. Nunc libero ante, hendrerit eget consectetur vel, viverra quis lectus.",
                "spans": []
              }
            ]
          }
        ]
      }
    }
  ]
}
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    // Create directory structure
    fs::create_dir_all(target_dir.join("source/images"))?;
    fs::create_dir_all(target_dir.join("languages"))?;
    fs::create_dir_all(target_dir.join("fixtures"))?;

    let files = [
        ("_config.yml", CONFIG),
        ("languages/pt-BR.yml", LANGUAGE_OVERRIDE),
        ("fixtures/posts.json", FIXTURES),
    ];

    for (relative, content) in files {
        let path = target_dir.join(relative);
        if path.exists() {
            tracing::warn!("Keeping existing {:?}", path);
            continue;
        }
        fs::write(&path, content)?;
        tracing::debug!("Created: {:?}", path);
    }

    Ok(())
}
