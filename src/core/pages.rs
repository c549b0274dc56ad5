//! Decides which pages exist and what each one depends on

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use super::call_graph::{EntityKind, FileAnalysis, Projection, ReverseCallGraph};
use super::indexer::SourceFile;
use super::render::{mermaid, FILE_TEMPLATE, OVERVIEW_TEMPLATE};
use super::scheduler::PageRequest;
use super::status::LineRange;

pub const OVERVIEW_PAGE: &str = "index.md";
/// Directory under the docs root that holds the per-file pages
pub const FILE_PAGES_DIR: &str = "files";

/// A source file together with what was extracted from it
#[derive(Debug, Clone)]
pub struct AnalyzedFile {
    pub source: SourceFile,
    pub analysis: FileAnalysis,
}

/// `files/<source path>.md`
pub fn file_page_path(source_path: &str) -> String {
    format!("{}/{}.md", FILE_PAGES_DIR, source_path)
}

/// Link from one page to another, both relative to the docs root
pub fn relative_link(from_page: &str, to_page: &str) -> String {
    let depth = from_page.matches('/').count();
    format!("{}{}", "../".repeat(depth), to_page)
}

#[derive(Serialize)]
struct CallerView {
    name: String,
    link: Option<String>,
}

#[derive(Serialize)]
struct EntityView<'a> {
    name: &'a str,
    kind: EntityKind,
    start_line: usize,
    end_line: usize,
    calls: &'a [String],
    used_by: Vec<CallerView>,
}

#[derive(Serialize)]
struct FilePageContext<'a> {
    template: &'static str,
    project: &'a str,
    path: &'a str,
    language: &'a str,
    line_count: usize,
    overview_link: String,
    entities: Vec<EntityView<'a>>,
}

#[derive(Serialize)]
struct FileSummary<'a> {
    path: &'a str,
    language: &'a str,
    entity_count: usize,
    link: Option<String>,
}

#[derive(Serialize)]
struct OverviewContext<'a> {
    template: &'static str,
    project: &'a str,
    file_count: usize,
    entity_count: usize,
    diagram: Option<String>,
    omitted_nodes: usize,
    files: Vec<FileSummary<'a>>,
}

/// Builds the page list for one run
pub struct PagePlanner<'a> {
    project: &'a str,
    files: &'a [AnalyzedFile],
    reverse: &'a ReverseCallGraph,
    projection: &'a Projection,
    /// Entity name -> source file that defines it, first definition wins
    owners: HashMap<&'a str, &'a str>,
}

impl<'a> PagePlanner<'a> {
    pub fn new(
        project: &'a str,
        files: &'a [AnalyzedFile],
        reverse: &'a ReverseCallGraph,
        projection: &'a Projection,
    ) -> Self {
        let mut owners = HashMap::new();
        for file in files {
            for entity in &file.analysis.entities {
                owners
                    .entry(entity.name.as_str())
                    .or_insert(file.source.path.as_str());
            }
        }

        Self {
            project,
            files,
            reverse,
            projection,
            owners,
        }
    }

    /// One page per file with entities, then the overview
    pub fn plan(&self) -> Result<Vec<PageRequest>, serde_json::Error> {
        let mut pages = Vec::new();
        for file in self.files {
            if !file.analysis.entities.is_empty() {
                pages.push(self.file_page(file)?);
            }
        }
        pages.push(self.overview_page()?);
        Ok(pages)
    }

    /// Callers of an entity, looked up by full name and by bare method name
    fn callers_of(&self, name: &str) -> Vec<&'a str> {
        let mut callers: Vec<&'a str> = self.reverse.callers_of(name).iter().map(String::as_str).collect();
        if let Some((_, short)) = name.rsplit_once('.') {
            for caller in self.reverse.callers_of(short) {
                if !callers.contains(&caller.as_str()) {
                    callers.push(caller.as_str());
                }
            }
        }
        callers
    }

    fn file_page(&self, file: &'a AnalyzedFile) -> Result<PageRequest, serde_json::Error> {
        let path = file_page_path(&file.source.path);
        let mut contributors = BTreeSet::from([file.source.path.clone()]);

        let entities: Vec<EntityView<'a>> = file
            .analysis
            .entities
            .iter()
            .map(|entity| {
                let used_by = self
                    .callers_of(&entity.name)
                    .into_iter()
                    .map(|caller| {
                        let owner = self.owners.get(caller).copied();
                        if let Some(owner) = owner {
                            contributors.insert(owner.to_string());
                        }
                        CallerView {
                            name: caller.to_string(),
                            link: owner.map(|owner| relative_link(&path, &file_page_path(owner))),
                        }
                    })
                    .collect();

                EntityView {
                    name: &entity.name,
                    kind: entity.kind,
                    start_line: entity.start_line,
                    end_line: entity.end_line,
                    calls: file.analysis.graph.callees(&entity.name).unwrap_or(&[]),
                    used_by,
                }
            })
            .collect();

        let line_info = file.analysis.line_span().map(|(start_line, end_line)| {
            BTreeMap::from([(file.source.path.clone(), LineRange { start_line, end_line })])
        });

        let context = serde_json::to_value(FilePageContext {
            template: FILE_TEMPLATE,
            project: self.project,
            path: &file.source.path,
            language: &file.source.language,
            line_count: file.source.line_count,
            overview_link: relative_link(&path, OVERVIEW_PAGE),
            entities,
        })?;

        Ok(PageRequest {
            entities: file.analysis.entities.iter().map(|e| e.name.clone()).collect(),
            source_files: contributors.into_iter().collect(),
            line_info,
            context,
            path,
        })
    }

    fn overview_page(&self) -> Result<PageRequest, serde_json::Error> {
        let files = self
            .files
            .iter()
            .map(|file| FileSummary {
                path: &file.source.path,
                language: &file.source.language,
                entity_count: file.analysis.entities.len(),
                link: (!file.analysis.entities.is_empty()).then(|| file_page_path(&file.source.path)),
            })
            .collect();

        let (diagram, omitted_nodes) = match self.projection.graph() {
            Some(graph) => (Some(mermaid(graph)), graph.omitted_nodes),
            None => (None, 0),
        };

        let context = serde_json::to_value(OverviewContext {
            template: OVERVIEW_TEMPLATE,
            project: self.project,
            file_count: self.files.len(),
            entity_count: self.files.iter().map(|f| f.analysis.entities.len()).sum(),
            diagram,
            omitted_nodes,
            files,
        })?;

        Ok(PageRequest {
            path: OVERVIEW_PAGE.to_string(),
            source_files: self.files.iter().map(|f| f.source.path.clone()).collect(),
            line_info: None,
            entities: Vec::new(),
            context,
        })
    }
}
