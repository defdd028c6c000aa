/// Fixed few-shot conversation used for inspections.
use super::ChatMessage;

/// Marker the model must end every complete reply with.
pub const DEFAULT_END_MARK: &str = "<|endofresponse|>";

/// Symbol value meaning "no symbol could be identified".
pub const NULL_SYMBOL: &str = "<null>";

pub fn system_message(java_version: u32, end_mark: &str) -> String {
    format!(
        r#"You are expert at Java and code refactoring. Please identify code blocks that can be rewritten with
new features/syntaxes/grammar sugar of Java {java_version} and earlier versions to make them more **readable**,
**efficient** and **concise** for given code.
I prefer `Stream` to loop, `Optional` to null, `record` to POJO, `switch` to if-else, etc.
Please comment on the rewritable code directly in the original source code in the following format:
```
other code...
// @PROBLEM: problem of the code in less than 10 words, should be as short as possible, starts with a gerund/noun word, e.g., "Using".
// @SOLUTION: solution to fix the problem in less than 10 words, should be as short as possible, starts with a verb.
// @SYMBOL: symbol of the problematic code block, must be a single word contained by the problematic code. it's usually a Java keyword, a method/field/variable name, or a value(e.g. magic number)... but NOT multiple, '{NULL_SYMBOL}' if cannot be identified
// @SEVERITY: severity of the problem, must be one of **[HIGH, MIDDLE, LOW]**, *HIGH* for Probable bugs, Security risks, Exception handling or Resource management(e.g. memory leaks); *MIDDLE* for Error handling, Performance, Reflective accesses issues and Verbose or redundant code; *LOW* for others
the original problematic code...
```
The comment must be placed directly above the problematic code, and the problematic code must be kept unchanged.
Your reply must be the complete original code sent to you plus your comments, without any other modifications.
Never comment on undertermined problems.
Never comment on code that is well-written or simple enough.
Don't add any explanation, don't format output. Don't output markdown.
You must end your response with "//{end_mark}"."#
    )
}

const EXAMPLE_USER_MESSAGE: &str = r#"@Entity
public class EmployeePojo implements Employee {
    public final String name;
    public EmployeePojo(String name) {
        this.name = name;
    }
    public String getRole() {
        String result = '';
        if (this.name.equals("Miller")) {
            result = "Senior";
        } else if (this.name.equals("Mike")) {
            result = "HR";
        } else {
            result = "FTE";
        }
        return result;
    }
    public void test(String[] arr) {
        try {
            Integer.parseInt(arr[0]);
        } catch (Exception e) {
            e.printStackTrace();
        }
    }
}
"#;

fn example_assistant_message(end_mark: &str) -> String {
    format!(
        r#"@Entity
// @PROBLEM: Using a traditional POJO
// @SOLUTION: transform into a record
// @SYMBOL: EmployeePojo
// @SEVERITY: MIDDLE
public class EmployeePojo implements Employee {{
    public final String name;
    public EmployeePojo(String name) {{
        this.name = name;
    }}
    public String getRole() {{
        String result = '';
        // @PROBLEM: Using if-else statements to check the type of animal
        // @SOLUTION: Use switch expression
        // @SYMBOL: if
        // @SEVERITY: MIDDLE
        if (this.name.equals("Miller")) {{
            result = "Senior";
        }} else if (this.name.equals("Mike")) {{
            result = "HR";
        }} else {{
            result = "FTE";
        }}
        return result;
    }}
    public void test(String[] arr) {{
        try {{
            Integer.parseInt(arr[0]);
        }} catch (Exception e) {{
            // @PROBLEM: Print stack trace in case of an exception
            // @SOLUTION: Log errors to a logger
            // @SYMBOL: ex.printStackTrace
            // @SEVERITY: LOW
            e.printStackTrace();
        }}
    }}
}}
//{end_mark}
"#
    )
}

/// Re-prompt sent when a reply stops before the end mark.
pub fn continue_message(end_mark: &str) -> String {
    format!(
        "continue where you left off, or end your response with \"{end_mark}\" to finish the conversation."
    )
}

/// System instruction plus the canned example exchange.
pub fn preamble(java_version: u32, end_mark: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_message(java_version, end_mark)),
        ChatMessage::user(EXAMPLE_USER_MESSAGE),
        ChatMessage::assistant(example_assistant_message(end_mark)),
    ]
}
