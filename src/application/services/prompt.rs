pub const DEFAULT_TEXT_QA_TEMPLATE: &str = "Context information is below.\n\
    ---------------------\n\
    {context_str}\n\
    ---------------------\n\
    Given the context information and not prior knowledge, answer the query.\n\
    Query: {query_str}\n\
    Answer: ";

pub const DEFAULT_FAITHFULNESS_TEMPLATE: &str =
    "Please tell if a given piece of information is supported by the context.\n\
    You need to answer with either YES or NO.\n\
    Answer YES if any of the context supports the information, even if most of the context is unrelated.\n\
    Information: {query_str}\n\
    Context: {context_str}\n\
    Answer: ";

pub const DEFAULT_RELEVANCY_TEMPLATE: &str =
    "Your task is to evaluate if the response for the query is in line with the context information provided.\n\
    You have two options to answer. Either YES or NO.\n\
    Answer YES if the response for the query is in line with context information otherwise NO.\n\
    Query: {query_str}\n\
    Response: {response_str}\n\
    Context: {context_str}\n\
    Answer: ";

/// Substitutes `{name}` placeholders in one pass, so substituted values are
/// never themselves expanded. Unknown placeholders are left as written.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let extra: usize = vars.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let substituted = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });

        match substituted {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Length of the template once every known placeholder is removed.
pub(crate) fn template_overhead(template: &str, names: &[&str]) -> usize {
    let vars: Vec<(&str, &str)> = names.iter().map(|n| (*n, "")).collect();
    render_template(template, &vars).len()
}
