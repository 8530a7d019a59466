//! Memo sections and prompt templates.

/// The fixed memo sections, in generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoSection {
    CompanyOverview,
    FinancialHighlights,
    RiskFactors,
    Opportunities,
    ValuationNotes,
}

impl MemoSection {
    pub const ALL: [MemoSection; 5] = [
        MemoSection::CompanyOverview,
        MemoSection::FinancialHighlights,
        MemoSection::RiskFactors,
        MemoSection::Opportunities,
        MemoSection::ValuationNotes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MemoSection::CompanyOverview => "Company Overview",
            MemoSection::FinancialHighlights => "Financial Highlights",
            MemoSection::RiskFactors => "Risk Factors",
            MemoSection::Opportunities => "Opportunities",
            MemoSection::ValuationNotes => "Valuation Notes",
        }
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            MemoSection::CompanyOverview => {
                "Summarize the company's core business, products, and market position."
            }
            MemoSection::FinancialHighlights => {
                "Extract and summarize key financial metrics: revenue, EBITDA, margins, and trends."
            }
            MemoSection::RiskFactors => {
                "List and explain the main risk factors, challenges, and market threats."
            }
            MemoSection::Opportunities => {
                "Identify growth areas, market tailwinds, and strategic opportunities."
            }
            MemoSection::ValuationNotes => {
                "Provide commentary on valuation, multiples, and any relevant financial context."
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

/// Instruction text for a section name; unknown names get a generic one.
pub fn section_instructions(section: &str) -> String {
    match MemoSection::from_name(section) {
        Some(known) => known.instructions().to_string(),
        None => format!("Summarize the section: {}", section),
    }
}

/// Full prompt for one memo section over the retrieved `context`.
pub fn build_memo_prompt(context: &str, section: &str) -> String {
    format!(
        "You are an expert investment analyst. Using ONLY the context below, write the '{section}' section of an investment memo.\n\n\
         Context:\n{context}\n\n\
         Instructions: {instructions}\n\
         Be concise, use bullet points where appropriate, and avoid speculation.",
        section = section,
        context = context,
        instructions = section_instructions(section),
    )
}

/// Prompt asking for a summary of raw chunk texts under a section heading.
pub fn build_summary_prompt(chunks: &[String], section: &str) -> String {
    format!(
        "You are an expert analyst. Summarize the following context for the section '{}':\n\n{}\n\n\
         Be concise and use bullet points where appropriate.",
        section,
        chunks.join("\n"),
    )
}
