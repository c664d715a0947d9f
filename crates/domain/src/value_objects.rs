use url::Url;

/// 从发布位URL或显示名称派生稳定键
///
/// URL 取规范化的 host + path（去掉 www 前缀与结尾斜杠，路径分隔符转为冒号）；
/// 非URL输入按名称做 slug 化。同一输入永远得到同一键。
pub fn derive_destination_key(input: &str) -> String {
    if let Ok(url) = Url::parse(input) {
        if let Some(host) = url.host_str() {
            let host = host.to_ascii_lowercase();
            let host = host.strip_prefix("www.").unwrap_or(&host);
            let path = url.path().trim_matches('/');
            if path.is_empty() {
                return host.to_string();
            }
            let path = path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(":");
            return format!("{host}:{path}");
        }
    }
    slugify(input)
}

fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true; // 避免以'-'开头
    for c in name.chars() {
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                out.push(lc);
            }
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_url_normalizes_host_and_path() {
        assert_eq!(
            derive_destination_key("https://www.linkedin.com/company/Acme/"),
            "linkedin.com:company:acme"
        );
        assert_eq!(
            derive_destination_key("https://medium.com/@acme"),
            "medium.com:@acme"
        );
        assert_eq!(derive_destination_key("https://blog.acme.io"), "blog.acme.io");
    }

    #[test]
    fn test_key_from_name_is_slugified() {
        assert_eq!(derive_destination_key("My Company Page"), "my-company-page");
        assert_eq!(derive_destination_key("  Acme -- Blog!  "), "acme-blog");
    }

    #[test]
    fn test_same_input_same_key() {
        let a = derive_destination_key("https://www.linkedin.com/company/acme");
        let b = derive_destination_key("https://www.linkedin.com/company/acme");
        assert_eq!(a, b);
    }
}
