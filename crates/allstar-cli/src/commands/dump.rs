use allstar_bytecode::atn::Atn;

pub fn run(atn: &Atn) {
    println!("grammar_type: {:?}", atn.grammar_type);
    println!("max_token_type: {}", atn.max_token_type);
    println!("states: {}", atn.states.len());
    println!("decisions: {}", atn.num_decisions());
    println!("rules: {}", atn.rule_to_start_state.len());
    println!();

    for state in &atn.states {
        let decision = state.decision.map(|d| format!(" decision={d}")).unwrap_or_default();
        println!(
            "  [{}] {:?} rule={}{}{}",
            state.index,
            state.state_type,
            state.rule_index,
            decision,
            if state.is_precedence_decision { " precedence" } else { "" },
        );
        for t in &state.transitions {
            println!("      -> {} : {:?}", t.target(), t);
        }
    }
}
